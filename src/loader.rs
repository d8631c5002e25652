//! This module provides the `ProgramLoader` struct, responsible for loading machine descriptions
//! from files, strings, and directories.

use crate::parser::{parse_automaton, parse_with_mode, AutomatonDescription, MachineDescription};
use crate::types::{TapeMode, TuringMachineError};
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of machine descriptions.
pub const DESCRIPTION_EXTENSION: &str = "tm";

/// `ProgramLoader` is a utility struct for loading machine descriptions.
/// It provides methods to load a description from a file or from string content,
/// and to discover and load all `.tm` files within a directory.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single machine description from the specified file path.
    ///
    /// # Arguments
    ///
    /// * `path` - A reference to the `Path` of the `.tm` file to load.
    /// * `mode` - The tape layout the machine runs on.
    ///
    /// # Returns
    ///
    /// * `Ok(MachineDescription)` if the file is read and parsed successfully.
    /// * `Err(TuringMachineError::FileError)` if the file cannot be read.
    /// * Any parsing error otherwise.
    pub fn load_machine(
        path: &Path,
        mode: TapeMode,
    ) -> Result<MachineDescription, TuringMachineError> {
        parse_with_mode(&Self::read(path)?, mode)
    }

    /// Loads a single machine description from the provided string content.
    pub fn load_machine_from_string(
        content: &str,
        mode: TapeMode,
    ) -> Result<MachineDescription, TuringMachineError> {
        parse_with_mode(content, mode)
    }

    /// Loads a finite automaton description from the specified file path.
    pub fn load_automaton(path: &Path) -> Result<AutomatonDescription, TuringMachineError> {
        parse_automaton(&Self::read(path)?)
    }

    /// Loads a finite automaton description from the provided string content.
    pub fn load_automaton_from_string(
        content: &str,
    ) -> Result<AutomatonDescription, TuringMachineError> {
        parse_automaton(content)
    }

    fn read(path: &Path) -> Result<String, TuringMachineError> {
        fs::read_to_string(path).map_err(|e| {
            TuringMachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    /// Loads every `.tm` file in `directory`.
    ///
    /// Directories and files with other extensions are skipped. Each element of the result
    /// holds either the path and its description or the error that prevented loading it.
    pub fn load_machines(
        directory: &Path,
        mode: TapeMode,
    ) -> Vec<Result<(PathBuf, MachineDescription), TuringMachineError>> {
        if !directory.exists() {
            return vec![Err(TuringMachineError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(TuringMachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut results: Vec<_> = entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(TuringMachineError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();

                if path.is_dir()
                    || path
                        .extension()
                        .is_none_or(|ext| ext != DESCRIPTION_EXTENSION)
                {
                    return None;
                }

                match Self::load_machine(&path, mode) {
                    Ok(description) => Some(Ok((path, description))),
                    Err(e) => Some(Err(TuringMachineError::FileError(format!(
                        "Failed to load machine from {}: {}",
                        path.display(),
                        e
                    )))),
                }
            })
            .collect();

        // read_dir order is platform dependent
        results.sort_by(|a, b| match (a, b) {
            (Ok((a, _)), Ok((b, _))) => a.cmp(b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => std::cmp::Ordering::Equal,
        });
        results
    }
}
