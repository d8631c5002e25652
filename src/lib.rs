//! This crate provides a bounded interpreter for deterministic single-tape Turing machines
//! and a harness that tests a machine against every input string in a length range.
//! It includes modules for describing machines in a line-oriented text format, running them
//! under step and wall-clock bounds, and enumerating inputs in a fixed order.

pub mod alphabet;
pub mod automaton;
pub mod engine;
pub mod harness;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod table;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
pub use alphabet::{Alphabet, InputAlphabet};
pub use automaton::FiniteAutomaton;
pub use engine::{Execution, Tracer};
pub use harness::{
    simulate, Simulate, SimulationConfig, SimulationReport, StringEnumerator, Summary, Tallies,
    TestRecord,
};
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the `TuringMachine` struct from the machine module.
pub use machine::TuringMachine;
pub use parser::{
    parse, parse_automaton, parse_with_mode, AutomatonDescription, MachineDescription,
};
pub use programs::{MachineInfo, MachineRegistry};
pub use table::TransitionTable;
pub use tape::Tape;
/// Re-exports the value types and errors shared across the crate.
pub use types::{
    Configuration, Direction, Limits, RunOutcome, RunReport, State, Step, Symbol, TapeMode,
    Transition, TransitionKey, TuringMachineError,
};
