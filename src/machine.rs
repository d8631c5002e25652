//! This module defines the `TuringMachine` struct: a deterministic single-tape machine with
//! numbered states, a tape alphabet, and a total transition function. Running it on an input
//! is delegated to [`Execution`].

use crate::alphabet::Alphabet;
use crate::engine::{Execution, Tracer};
use crate::table::TransitionTable;
use crate::tape::Tape;
use crate::types::{
    Direction, Limits, RunReport, State, Symbol, TapeMode, Transition, TransitionKey,
    TuringMachineError, DEFAULT_INCLUDE_STILL,
};

/// A deterministic Turing machine.
///
/// States are `0..num_states`; state 0 is the start state, `num_states - 2` accepts and
/// `num_states - 1` rejects. Every other state is ordinary and has a transition for every
/// tape symbol, synthesized when not given explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuringMachine {
    alphabet: Alphabet,
    table: TransitionTable,
}

impl TuringMachine {
    /// Creates a machine with only default transitions.
    ///
    /// # Arguments
    ///
    /// * `num_states` - Total number of states, accept and reject included.
    /// * `tape_symbols` - The user tape symbols, without `leftend` or `blank`.
    /// * `input_size` - How many of `tape_symbols` form the input alphabet.
    /// * `mode` - The tape layout.
    pub fn new<S: AsRef<str>>(
        num_states: usize,
        tape_symbols: &[S],
        input_size: usize,
        mode: TapeMode,
    ) -> Result<Self, TuringMachineError> {
        let alphabet = Alphabet::new(tape_symbols, input_size, mode)?;
        let table = TransitionTable::new(num_states, &alphabet, DEFAULT_INCLUDE_STILL)?;

        Ok(Self { alphabet, table })
    }

    pub fn num_states(&self) -> usize {
        self.table.num_states()
    }

    pub fn accept_state(&self) -> State {
        self.table.accept_state()
    }

    pub fn reject_state(&self) -> State {
        self.table.reject_state()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn mode(&self) -> TapeMode {
        self.alphabet.mode()
    }

    pub fn include_still(&self) -> bool {
        self.table.include_still()
    }

    /// Registers a transition given by indices.
    pub fn put(
        &mut self,
        state: State,
        read: Symbol,
        next_state: State,
        write: Symbol,
        direction: Direction,
        replace: bool,
    ) -> Result<(), TuringMachineError> {
        self.table.put(
            TransitionKey::new(state, read),
            Transition::new(next_state, write, direction),
            replace,
        )
    }

    /// Registers a transition given by symbol names and a direction token (`L`, `R` or `S`).
    pub fn put_transition(
        &mut self,
        state: State,
        read: &str,
        next_state: State,
        write: &str,
        direction: &str,
        replace: bool,
    ) -> Result<TransitionKey, TuringMachineError> {
        let read = self.symbol_index(read)?;
        let write = self.symbol_index(write)?;
        let direction = Direction::from_token(direction).ok_or_else(|| {
            TuringMachineError::InvalidDirection(format!(
                "Given direction(\"{direction}\") isn't one of L, R, S."
            ))
        })?;

        self.put(state, read, next_state, write, direction, replace)?;
        Ok(TransitionKey::new(state, read))
    }

    fn symbol_index(&self, symbol: &str) -> Result<Symbol, TuringMachineError> {
        self.alphabet.index_of(symbol).ok_or_else(|| {
            TuringMachineError::InvalidTransition(format!(
                "\"{symbol}\" isn't a tape symbol."
            ))
        })
    }

    /// The transition used for `key`, explicit or synthesized.
    pub fn transition(&self, key: TransitionKey) -> Result<Transition, TuringMachineError> {
        self.table.get(key)
    }

    pub fn reset_transition(
        &mut self,
        key: TransitionKey,
    ) -> Result<Transition, TuringMachineError> {
        self.table.reset(key)
    }

    pub fn reset_state(
        &mut self,
        state: State,
    ) -> Result<Vec<(TransitionKey, Transition)>, TuringMachineError> {
        self.table.reset_state(state)
    }

    pub fn reset_all(&mut self) -> Vec<(TransitionKey, Transition)> {
        self.table.reset_all()
    }

    /// Changes the number of states. See [`TransitionTable::resize`].
    pub fn set_num_states(
        &mut self,
        num_states: usize,
        preserve_valid: bool,
    ) -> Result<(), TuringMachineError> {
        self.table.resize(num_states, preserve_valid)
    }

    /// Enables or disables `Still`, returning any transitions purged by disabling it.
    pub fn set_include_still(&mut self, include_still: bool) -> Vec<(TransitionKey, Transition)> {
        self.table.set_include_still(include_still)
    }

    /// Loads `input` onto a fresh tape.
    pub fn tape_for(&self, input: &[Symbol]) -> Result<Tape, TuringMachineError> {
        Tape::from_input(input, &self.alphabet)
    }

    /// Prepares a run on `input` from the start state at the canonical head position.
    pub fn execution(&self, input: &[Symbol]) -> Result<Execution<'_>, TuringMachineError> {
        Ok(Execution::new(self, 0, self.tape_for(input)?))
    }

    /// Runs the machine on `input` from the start state.
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` with the outcome and the number of completed steps.
    /// * `Err(TuringMachineError::InvalidTestString)` if `input` uses non-input symbols.
    pub fn run(
        &self,
        input: &[Symbol],
        limits: &Limits,
        tracer: Option<&mut dyn Tracer>,
    ) -> Result<RunReport, TuringMachineError> {
        Ok(self.execution(input)?.run(limits, tracer))
    }

    /// Runs the machine on `input` from an arbitrary ordinary state and head position.
    pub fn run_from(
        &self,
        input: &[Symbol],
        state: State,
        head: usize,
        limits: &Limits,
        tracer: Option<&mut dyn Tracer>,
    ) -> Result<RunReport, TuringMachineError> {
        if state >= self.accept_state() {
            return Err(TuringMachineError::InvalidState(format!(
                "Given initial state({state}) isn't in the range of [0, {}].",
                self.accept_state() - 1
            )));
        }

        let tape = self.tape_for(input)?.with_head(head);
        Ok(Execution::new(self, state, tape).run(limits, tracer))
    }

    /// Tokenizes `text` over the input alphabet and runs the machine on it.
    pub fn run_str(&self, text: &str, limits: &Limits) -> Result<RunReport, TuringMachineError> {
        let input = self.alphabet.tokenize(text)?;
        self.run(&input, limits, None)
    }

    /// Formats a transition the way machine descriptions write it, e.g. `0 a 1 X R`.
    pub fn describe(
        &self,
        key: TransitionKey,
        transition: Transition,
    ) -> Result<String, TuringMachineError> {
        Ok(format!(
            "{} {} {} {} {}",
            key.state,
            self.alphabet.symbol(key.symbol)?,
            transition.next_state,
            self.alphabet.symbol(transition.write)?,
            transition.direction.as_str()
        ))
    }
}
