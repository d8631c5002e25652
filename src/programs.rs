//! A registry of named machines, seeded with the sample machines bundled under `machines/`.

use std::path::Path;

use tracing::warn;

use crate::loader::ProgramLoader;
use crate::parser::{parse, MachineDescription};
use crate::types::{TapeMode, TuringMachineError};

// Bundled sample machines, written for the left-end marker tape.
const BUNDLED: [(&str, &str); 3] = [
    ("contains-one", include_str!("../machines/contains-one.tm")),
    ("even-length", include_str!("../machines/even-length.tm")),
    ("anbn", include_str!("../machines/anbn.tm")),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredMachine {
    pub name: String,
    pub description: MachineDescription,
}

/// Named machines in registration order.
#[derive(Debug, Default, Clone)]
pub struct MachineRegistry {
    machines: Vec<RegisteredMachine>,
    machine_count: usize,
}

impl MachineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every bundled machine that parses.
    pub fn with_bundled() -> Self {
        let mut registry = Self::new();

        for (name, text) in BUNDLED {
            if let Err(e) = registry.register_text(name, text) {
                warn!(machine = name, error = %e, "skipping bundled machine");
            }
        }

        registry
    }

    /// Number of machines this registry has parsed and kept. Descriptions rejected for any
    /// reason, including a duplicate name, don't count.
    pub fn machine_count(&self) -> usize {
        self.machine_count
    }

    /// Adds an already built machine under `name`, returning its index.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: MachineDescription,
    ) -> Result<usize, TuringMachineError> {
        let name = name.into();
        if self.index_of(&name).is_some() {
            return Err(TuringMachineError::InvalidConfig(format!(
                "Machine '{name}' is already registered"
            )));
        }

        self.machines.push(RegisteredMachine { name, description });
        Ok(self.machines.len() - 1)
    }

    /// Parses `text` as a marker-tape description and registers it under `name`.
    pub fn register_text(
        &mut self,
        name: impl Into<String>,
        text: &str,
    ) -> Result<usize, TuringMachineError> {
        let index = self.register(name, parse(text)?)?;
        self.machine_count += 1;
        Ok(index)
    }

    /// Registers every `.tm` file of `directory` under its file stem.
    ///
    /// Files that fail to load are logged and skipped. Returns how many machines were added.
    pub fn register_directory(&mut self, directory: &Path, mode: TapeMode) -> usize {
        let mut added = 0;

        for result in ProgramLoader::load_machines(directory, mode) {
            let outcome = result.and_then(|(path, description)| {
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.register(name, description)
            });

            match outcome {
                Ok(_) => {
                    self.machine_count += 1;
                    added += 1;
                }
                Err(e) => warn!(directory = %directory.display(), error = %e, "skipping machine"),
            }
        }

        added
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.machines.iter().position(|m| m.name == name)
    }

    /// Get a machine by its index
    pub fn get_by_index(&self, index: usize) -> Result<&RegisteredMachine, TuringMachineError> {
        self.machines.get(index).ok_or_else(|| {
            TuringMachineError::InvalidConfig(format!("Machine index {index} out of range"))
        })
    }

    /// Get a machine by its name
    pub fn get_by_name(&self, name: &str) -> Result<&RegisteredMachine, TuringMachineError> {
        self.index_of(name)
            .map(|index| &self.machines[index])
            .ok_or_else(|| TuringMachineError::InvalidConfig(format!("Machine '{name}' not found")))
    }

    pub fn names(&self) -> Vec<&str> {
        self.machines.iter().map(|m| m.name.as_str()).collect()
    }

    /// Indices of the machines whose name contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<usize> {
        let query = query.to_lowercase();

        self.machines
            .iter()
            .enumerate()
            .filter(|(_, m)| m.name.to_lowercase().contains(&query))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn info(&self, index: usize) -> Result<MachineInfo, TuringMachineError> {
        let registered = self.get_by_index(index)?;
        let machine = &registered.description.machine;

        Ok(MachineInfo {
            index,
            name: registered.name.clone(),
            num_states: machine.num_states(),
            tape_alphabet: machine.alphabet().symbols().to_vec(),
            input_alphabet_size: machine.alphabet().input_len(),
            transition_count: machine.table().defined_count(),
            mode: machine.mode(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInfo {
    pub index: usize,
    pub name: String,
    pub num_states: usize,
    pub tape_alphabet: Vec<String>,
    pub input_alphabet_size: usize,
    pub transition_count: usize,
    pub mode: TapeMode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::simulate;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_bundled_machines_load() {
        let registry = MachineRegistry::with_bundled();

        assert_eq!(registry.len(), BUNDLED.len());
        assert_eq!(registry.machine_count(), BUNDLED.len());
        assert_eq!(registry.names(), vec!["contains-one", "even-length", "anbn"]);
    }

    #[test]
    fn test_bundled_machines_enumerate() {
        let registry = MachineRegistry::with_bundled();

        for (name, tested, accepted) in [
            ("contains-one", 31, 26),
            ("even-length", 15, 5),
            ("anbn", 31, 3),
        ] {
            let description = &registry.get_by_name(name).unwrap().description;
            let report = simulate(&description.machine, &description.config, None).unwrap();

            assert_eq!(report.tested(), tested, "{name}");
            assert_eq!(report.tallies().accepted, accepted, "{name}");
            assert_eq!(report.tallies().rejected, tested - accepted, "{name}");
        }
    }

    #[test]
    fn test_anbn_accepts_ab_in_five_steps() {
        let registry = MachineRegistry::with_bundled();
        let machine = &registry.get_by_name("anbn").unwrap().description.machine;

        let report = machine.run_str("ab", &Default::default()).unwrap();
        assert_eq!(report.outcome, crate::types::RunOutcome::Accepted);
        assert_eq!(report.step_count, 5);
    }

    #[test]
    fn test_lookup() {
        let registry = MachineRegistry::with_bundled();

        assert!(registry.get_by_index(0).is_ok());
        assert!(registry.get_by_index(999).is_err());
        assert!(registry.get_by_name("Nonexistent").is_err());

        assert_eq!(registry.search("EVEN"), vec![1]);
        assert_eq!(registry.search("n"), vec![0, 1, 2]);
        assert!(registry.search("nonexistent").is_empty());
    }

    #[test]
    fn test_info() {
        let registry = MachineRegistry::with_bundled();

        let info = registry.info(2).unwrap();
        assert_eq!(info.name, "anbn");
        assert_eq!(info.num_states, 6);
        assert_eq!(info.input_alphabet_size, 2);
        assert_eq!(info.transition_count, 20);
        assert_eq!(
            info.tape_alphabet,
            vec!["a", "b", "X", "Y", "leftend", "blank"]
        );
        assert!(registry.info(3).is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = MachineRegistry::with_bundled();
        let text = BUNDLED[0].1;

        assert!(registry.register_text("contains-one", text).is_err());
        assert_eq!(registry.len(), BUNDLED.len());
        assert_eq!(registry.machine_count(), BUNDLED.len());
        assert!(registry.register_text("copy", text).is_ok());
        assert_eq!(registry.len(), BUNDLED.len() + 1);
        assert_eq!(registry.machine_count(), BUNDLED.len() + 1);
    }

    #[test]
    fn test_register_directory() {
        let dir = tempdir().unwrap();
        let mut file = File::create(dir.path().join("custom.tm")).unwrap();
        file.write_all(b"3 2 1\nx\n1\n0 x 1 x R\n").unwrap();
        let mut taken = File::create(dir.path().join("taken.tm")).unwrap();
        taken.write_all(b"3 2 1\nx\n0\n").unwrap();
        let mut broken = File::create(dir.path().join("broken.tm")).unwrap();
        broken.write_all(b"not a machine").unwrap();

        let mut registry = MachineRegistry::new();
        registry.register_text("taken", "3 3 1\ny\n0\n").unwrap();
        assert_eq!(registry.register_directory(dir.path(), TapeMode::TwoWay), 1);
        assert_eq!(registry.names(), vec!["taken", "custom"]);
        assert_eq!(registry.machine_count(), 2);
        assert_eq!(registry.info(1).unwrap().mode, TapeMode::TwoWay);
    }
}
