//! The transition function, stored as a dense `ordinary state × tape symbol` grid.
//!
//! Every cell always holds a transition. Cells nobody defined hold the identity transition
//! (same state, same symbol, move right); a parallel bitmap records which cells were supplied
//! explicitly. The bitmap only matters when registering transitions, never when running.

use tracing::debug;

use crate::alphabet::Alphabet;
use crate::types::{
    Direction, State, Symbol, Transition, TransitionKey, TuringMachineError, MAX_NUM_STATES,
    MIN_NUM_STATES,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    num_states: usize,
    tape_size: usize,
    leftend: Option<Symbol>,
    include_still: bool,
    cells: Vec<Transition>,
    defined: Vec<bool>,
    state_defined: Vec<usize>,
    defined_count: usize,
    still_count: usize,
}

impl TransitionTable {
    /// Creates a table where every cell holds its identity transition.
    pub fn new(
        num_states: usize,
        alphabet: &Alphabet,
        include_still: bool,
    ) -> Result<Self, TuringMachineError> {
        check_num_states(num_states)?;

        let mut table = Self {
            num_states,
            tape_size: alphabet.len(),
            leftend: alphabet.leftend(),
            include_still,
            cells: Vec::new(),
            defined: Vec::new(),
            state_defined: Vec::new(),
            defined_count: 0,
            still_count: 0,
        };
        table.initialize();

        Ok(table)
    }

    fn initialize(&mut self) {
        let ordinary = self.accept_state();
        let tape_size = self.tape_size;

        self.cells = (0..ordinary)
            .flat_map(|state| {
                (0..tape_size).map(move |symbol| {
                    Transition::identity(TransitionKey::new(state, symbol))
                })
            })
            .collect();
        self.defined = vec![false; self.cells.len()];
        self.state_defined = vec![0; ordinary];
        self.defined_count = 0;
        self.still_count = 0;
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn accept_state(&self) -> State {
        self.num_states - 2
    }

    pub fn reject_state(&self) -> State {
        self.num_states - 1
    }

    pub fn tape_size(&self) -> usize {
        self.tape_size
    }

    pub fn include_still(&self) -> bool {
        self.include_still
    }

    /// Directions a transition may currently use.
    pub fn valid_directions(&self) -> &'static [Direction] {
        if self.include_still {
            &[Direction::Left, Direction::Right, Direction::Still]
        } else {
            &[Direction::Left, Direction::Right]
        }
    }

    /// Number of cells, i.e. ordinary states times tape symbols.
    pub fn total(&self) -> usize {
        self.cells.len()
    }

    pub fn defined_count(&self) -> usize {
        self.defined_count
    }

    pub fn still_count(&self) -> usize {
        self.still_count
    }

    pub fn state_defined_count(&self, state: State) -> Result<usize, TuringMachineError> {
        self.check_initial_state(state)?;
        Ok(self.state_defined[state])
    }

    fn slot(&self, key: TransitionKey) -> usize {
        key.state * self.tape_size + key.symbol
    }

    fn check_initial_state(&self, state: State) -> Result<(), TuringMachineError> {
        if state >= self.accept_state() {
            return Err(TuringMachineError::InvalidTransition(format!(
                "Given initial state({state}) isn't in the range of [0, {}].",
                self.accept_state() - 1
            )));
        }
        Ok(())
    }

    fn check_key(&self, key: TransitionKey) -> Result<usize, TuringMachineError> {
        self.check_initial_state(key.state)?;
        if key.symbol >= self.tape_size {
            return Err(TuringMachineError::InvalidTransition(format!(
                "Given initial symbol index({}) isn't in the range of [0, {}].",
                key.symbol,
                self.tape_size - 1
            )));
        }
        Ok(self.slot(key))
    }

    /// Looks up the transition for a key the caller already knows to be in range.
    pub(crate) fn lookup(&self, state: State, symbol: Symbol) -> Transition {
        self.cells[state * self.tape_size + symbol]
    }

    pub fn get(&self, key: TransitionKey) -> Result<Transition, TuringMachineError> {
        Ok(self.cells[self.check_key(key)?])
    }

    pub fn is_defined(&self, key: TransitionKey) -> Result<bool, TuringMachineError> {
        Ok(self.defined[self.check_key(key)?])
    }

    /// Checks every component of a transition against the current bounds.
    pub fn validate(
        &self,
        key: TransitionKey,
        transition: Transition,
    ) -> Result<usize, TuringMachineError> {
        let slot = self.check_key(key)?;

        if transition.next_state >= self.num_states {
            return Err(TuringMachineError::InvalidTransition(format!(
                "Given next state({}) isn't in the range of [0, {}].",
                transition.next_state,
                self.reject_state()
            )));
        }
        if transition.write >= self.tape_size {
            return Err(TuringMachineError::InvalidTransition(format!(
                "Given written symbol index({}) isn't in the range of [0, {}].",
                transition.write,
                self.tape_size - 1
            )));
        }
        if !self.valid_directions().contains(&transition.direction) {
            return Err(TuringMachineError::InvalidDirection(format!(
                "Given direction({}) isn't one of {}.",
                transition.direction.as_str(),
                self.valid_directions()
                    .iter()
                    .map(|d| d.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        if let Some(leftend) = self.leftend {
            if key.symbol == leftend
                && (transition.write != leftend || transition.direction != Direction::Right)
            {
                return Err(TuringMachineError::LeftendViolation(format!(
                    "Transition from state {} on the left-end marker must write the marker and move right.",
                    key.state
                )));
            }
        }

        Ok(slot)
    }

    /// Stores `transition` for `key` and marks the cell as defined.
    ///
    /// Fails when the cell is already defined and `replace` is false.
    pub fn put(
        &mut self,
        key: TransitionKey,
        transition: Transition,
        replace: bool,
    ) -> Result<(), TuringMachineError> {
        let slot = self.validate(key, transition)?;
        let is_still = transition.direction == Direction::Still;

        if self.defined[slot] {
            if !replace {
                return Err(TuringMachineError::InvalidTransition(format!(
                    "A transition from state {} on symbol index {} has already been defined.",
                    key.state, key.symbol
                )));
            }
            let was_still = self.cells[slot].direction == Direction::Still;
            match (was_still, is_still) {
                (false, true) => self.still_count += 1,
                (true, false) => self.still_count -= 1,
                _ => {}
            }
        } else {
            self.defined[slot] = true;
            self.defined_count += 1;
            self.state_defined[key.state] += 1;
            if is_still {
                self.still_count += 1;
            }
        }

        self.cells[slot] = transition;
        Ok(())
    }

    fn clear(&mut self, slot: usize, key: TransitionKey) -> Transition {
        let previous = std::mem::replace(&mut self.cells[slot], Transition::identity(key));
        if self.defined[slot] {
            self.defined[slot] = false;
            self.defined_count -= 1;
            self.state_defined[key.state] -= 1;
            if previous.direction == Direction::Still {
                self.still_count -= 1;
            }
        }
        previous
    }

    /// Restores the identity transition for `key`, returning what was there before.
    pub fn reset(&mut self, key: TransitionKey) -> Result<Transition, TuringMachineError> {
        let slot = self.check_key(key)?;
        Ok(self.clear(slot, key))
    }

    /// Resets every defined transition out of `state`, returning them.
    pub fn reset_state(
        &mut self,
        state: State,
    ) -> Result<Vec<(TransitionKey, Transition)>, TuringMachineError> {
        self.check_initial_state(state)?;

        let keys: Vec<_> = self
            .defined_transitions()
            .filter(|(key, _)| key.state == state)
            .map(|(key, _)| key)
            .collect();

        Ok(keys
            .into_iter()
            .map(|key| (key, self.clear(self.slot(key), key)))
            .collect())
    }

    /// Resets every defined transition, returning them.
    pub fn reset_all(&mut self) -> Vec<(TransitionKey, Transition)> {
        let cleared = self.defined_transitions().collect();
        self.initialize();
        cleared
    }

    /// Iterates over the explicitly defined transitions in key order.
    pub fn defined_transitions(&self) -> impl Iterator<Item = (TransitionKey, Transition)> + '_ {
        self.defined
            .iter()
            .enumerate()
            .filter(|&(_, &defined)| defined)
            .map(|(slot, _)| {
                let key = TransitionKey::new(slot / self.tape_size, slot % self.tape_size);
                (key, self.cells[slot])
            })
    }

    /// Changes the number of states.
    ///
    /// With `preserve_valid`, every defined transition that is still valid under the new bound
    /// is kept; the others are dropped without error.
    pub fn resize(
        &mut self,
        num_states: usize,
        preserve_valid: bool,
    ) -> Result<(), TuringMachineError> {
        check_num_states(num_states)?;
        if num_states == self.num_states {
            return Ok(());
        }

        let kept: Vec<_> = if preserve_valid {
            self.defined_transitions().collect()
        } else {
            Vec::new()
        };

        self.num_states = num_states;
        self.initialize();

        let mut dropped = 0;
        for (key, transition) in kept {
            if self.put(key, transition, false).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(num_states, dropped, "dropped transitions invalidated by resize");
        }

        Ok(())
    }

    /// Enables or disables the `Still` direction.
    ///
    /// Disabling purges every transition that uses it and returns the purged transitions.
    pub fn set_include_still(&mut self, include_still: bool) -> Vec<(TransitionKey, Transition)> {
        self.include_still = include_still;
        if include_still || self.still_count == 0 {
            return Vec::new();
        }

        let keys: Vec<_> = self
            .defined_transitions()
            .filter(|(_, t)| t.direction == Direction::Still)
            .map(|(key, _)| key)
            .collect();

        keys.into_iter()
            .map(|key| (key, self.clear(self.slot(key), key)))
            .collect()
    }
}

/// Checks that `num_states` leaves room for at least one ordinary state.
pub fn check_num_states(num_states: usize) -> Result<(), TuringMachineError> {
    if !(MIN_NUM_STATES..=MAX_NUM_STATES).contains(&num_states) {
        return Err(TuringMachineError::InvalidNumStates(format!(
            "Given number of states({num_states}) isn't in the range of [{MIN_NUM_STATES}, {MAX_NUM_STATES}]."
        )));
    }
    Ok(())
}
