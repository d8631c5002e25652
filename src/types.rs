//! This module defines the core data structures and types used throughout the simulator,
//! including transitions, run outcomes, execution limits, and error types.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::Rule;

/// A machine state. `num_states - 2` accepts and `num_states - 1` rejects.
pub type State = usize;
/// An index into a tape (or input) alphabet.
pub type Symbol = usize;

/// The smallest machine has one ordinary state plus accept and reject.
pub const MIN_NUM_STATES: usize = 3;
pub const MAX_NUM_STATES: usize = 10000;
pub const MIN_INPUT_ALPHABET_SIZE: usize = 1;
/// Upper bound on the tape alphabet, special symbols included.
pub const MAX_TAPE_ALPHABET_SIZE: usize = 1000;

/// Reserved name of the blank tape symbol.
pub const BLANK: &str = "blank";
/// Reserved name of the left-end marker.
pub const LEFTEND: &str = "leftend";

/// Keyword accepted in place of any settings field.
pub const DEFAULT: &str = "default";
pub const DEFAULT_MAX_STRING_COUNT: usize = 100;
/// Ceiling for the pre-flight estimate of strings to enumerate.
pub const MAX_STRINGS_COUNT: usize = 100_000;
pub const DEFAULT_MIN_LENGTH: usize = 0;
pub const DEFAULT_MAX_LENGTH: usize = 5;
pub const DEFAULT_MAX_STEPS: u64 = u64::MAX;
/// One hour.
pub const DEFAULT_MAX_PROCESS_TIME_MS: u64 = 3_600_000;
pub const MAX_PROCESS_TIME_MS: u64 = u64::MAX / 1_000_000;
pub const DEFAULT_INCLUDE_STILL: bool = true;
/// The maximum allowed size for a machine description in bytes.
pub const MAX_DESCRIPTION_SIZE: usize = 1 << 20;

/// Which tape layout the machine runs on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TapeMode {
    /// Position 0 permanently holds `leftend`; the tape only grows rightward.
    #[default]
    LeftEnd,
    /// No marker; the tape grows on either end.
    TwoWay,
}

impl TapeMode {
    /// Names of the special symbols appended after the user symbols, in index order.
    pub fn special_symbols(self) -> &'static [&'static str] {
        match self {
            TapeMode::LeftEnd => &[LEFTEND, BLANK],
            TapeMode::TwoWay => &[BLANK],
        }
    }

    /// Head position a freshly loaded input starts at.
    pub fn initial_head(self) -> usize {
        match self {
            TapeMode::LeftEnd => 1,
            TapeMode::TwoWay => 0,
        }
    }
}

/// Represents the possible directions a Turing Machine head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in place. Only legal while the machine enables it.
    Still,
}

impl Direction {
    /// Parses the single-letter form used in machine descriptions.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "L" => Some(Direction::Left),
            "R" => Some(Direction::Right),
            "S" => Some(Direction::Still),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "L",
            Direction::Right => "R",
            Direction::Still => "S",
        }
    }
}

/// The `(initial state, read symbol)` pair a transition is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionKey {
    pub state: State,
    pub symbol: Symbol,
}

impl TransitionKey {
    pub fn new(state: State, symbol: Symbol) -> Self {
        Self { state, symbol }
    }
}

/// What the machine does for one `(state, symbol)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The next state the machine transitions to.
    pub next_state: State,
    /// The symbol written over the one just read.
    pub write: Symbol,
    /// Where the head moves afterwards.
    pub direction: Direction,
}

impl Transition {
    pub fn new(next_state: State, write: Symbol, direction: Direction) -> Self {
        Self {
            next_state,
            write,
            direction,
        }
    }

    /// The synthesized default: stay in the same state, rewrite the same symbol, move right.
    pub fn identity(key: TransitionKey) -> Self {
        Self::new(key.state, key.symbol, Direction::Right)
    }
}

/// How a single bounded run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunOutcome {
    Accepted,
    Rejected,
    /// The step bound stopped the run before the machine halted.
    StepBoundExceeded,
    /// The wall-clock bound stopped the run before the machine halted.
    TimeBoundExceeded,
}

impl RunOutcome {
    /// Whether the machine itself decided the input.
    pub fn is_halted(self) -> bool {
        matches!(self, RunOutcome::Accepted | RunOutcome::Rejected)
    }
}

/// The result of one bounded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Number of completed steps.
    pub step_count: u64,
    /// Time spent stepping, in milliseconds. Only measured while a time bound is active.
    pub elapsed_ms: Option<u64>,
}

/// Resource bounds applied to every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_steps: u64,
    /// Wall-clock bound on stepping. `None` disables time measurement.
    pub max_time: Option<Duration>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_time: None,
        }
    }
}

impl Limits {
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_time(mut self, max_time: Option<Duration>) -> Self {
        self.max_time = max_time;
        self
    }
}

/// A snapshot of a running machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub state: State,
    pub tape: Vec<Symbol>,
    pub head: usize,
    /// Steps completed when the snapshot was taken.
    pub step: u64,
}

/// Represents the outcome of a single execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The machine performed a step and continues execution.
    Continue,
    /// The machine is in the accept or reject state.
    Halt(RunOutcome),
}

/// Represents the errors that can occur while building, loading, or enumerating machines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuringMachineError {
    #[error("Invalid number of states: {0}")]
    InvalidNumStates(String),
    #[error("Invalid alphabet: {0}")]
    InvalidAlphabet(String),
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
    #[error("Invalid test string: {0}")]
    InvalidTestString(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),
    #[error("Left-end violation: {0}")]
    LeftendViolation(String),
    #[error("Too many strings: {0}")]
    TooManyStrings(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Indicates a structural error in a machine description.
    #[error("Description parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
}

impl TuringMachineError {
    /// Prefixes the cause with the description line it was raised for.
    pub fn on_line(self, line: usize) -> Self {
        use TuringMachineError::*;

        let at = |cause: String| format!("line {line}: {cause}");
        match self {
            InvalidNumStates(c) => InvalidNumStates(at(c)),
            InvalidAlphabet(c) => InvalidAlphabet(at(c)),
            InvalidSymbol(c) => InvalidSymbol(at(c)),
            InvalidTestString(c) => InvalidTestString(at(c)),
            InvalidState(c) => InvalidState(at(c)),
            InvalidTransition(c) => InvalidTransition(at(c)),
            InvalidDirection(c) => InvalidDirection(at(c)),
            LeftendViolation(c) => LeftendViolation(at(c)),
            TooManyStrings(c) => TooManyStrings(at(c)),
            InvalidConfig(c) => InvalidConfig(at(c)),
            FileError(c) => FileError(at(c)),
            // pest errors already carry their position
            e @ ParseError(_) => e,
        }
    }
}
