//! A deterministic finite automaton that can be enumerated the same way as a Turing machine.

use crate::alphabet::InputAlphabet;
use crate::engine::Tracer;
use crate::harness::Simulate;
use crate::types::{
    Configuration, Limits, RunOutcome, RunReport, State, Symbol, TuringMachineError,
    MAX_NUM_STATES,
};

pub const MIN_AUTOMATON_STATES: usize = 1;

pub fn check_automaton_states(num_states: usize) -> Result<(), TuringMachineError> {
    if !(MIN_AUTOMATON_STATES..=MAX_NUM_STATES).contains(&num_states) {
        return Err(TuringMachineError::InvalidNumStates(format!(
            "Given number of states({num_states}) isn't in the range of [{MIN_AUTOMATON_STATES}, {MAX_NUM_STATES}]."
        )));
    }
    Ok(())
}

/// A DFA with a total transition function; undefined transitions loop on their state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiniteAutomaton {
    input: InputAlphabet,
    accepting: Vec<bool>,
    accepting_count: usize,
    next: Vec<State>,
    defined: Vec<bool>,
    defined_count: usize,
}

impl FiniteAutomaton {
    pub fn new<S: AsRef<str>>(
        num_states: usize,
        symbols: &[S],
    ) -> Result<Self, TuringMachineError> {
        check_automaton_states(num_states)?;

        let input = InputAlphabet::new(symbols)?;
        let cells = num_states * input.len();
        let next = (0..cells).map(|slot| slot / input.len()).collect();

        Ok(Self {
            input,
            accepting: vec![false; num_states],
            accepting_count: 0,
            next,
            defined: vec![false; cells],
            defined_count: 0,
        })
    }

    pub fn num_states(&self) -> usize {
        self.accepting.len()
    }

    pub fn alphabet(&self) -> &InputAlphabet {
        &self.input
    }

    pub fn accepting_count(&self) -> usize {
        self.accepting_count
    }

    pub fn defined_count(&self) -> usize {
        self.defined_count
    }

    pub fn is_accepting(&self, state: State) -> Result<bool, TuringMachineError> {
        self.check_state(state)?;
        Ok(self.accepting[state])
    }

    fn check_state(&self, state: State) -> Result<(), TuringMachineError> {
        if state >= self.num_states() {
            return Err(TuringMachineError::InvalidState(format!(
                "Given state({state}) isn't in the range of [0, {}].",
                self.num_states() - 1
            )));
        }
        Ok(())
    }

    fn slot(&self, state: State, symbol: Symbol) -> Result<usize, TuringMachineError> {
        self.check_state(state)?;
        if symbol >= self.input.len() {
            return Err(TuringMachineError::InvalidTransition(format!(
                "Given symbol index({symbol}) isn't in the range of [0, {}].",
                self.input.len() - 1
            )));
        }
        Ok(state * self.input.len() + symbol)
    }

    pub fn set_accepting(&mut self, state: State, accepting: bool) -> Result<(), TuringMachineError> {
        self.check_state(state)?;
        if self.accepting[state] != accepting {
            self.accepting[state] = accepting;
            if accepting {
                self.accepting_count += 1;
            } else {
                self.accepting_count -= 1;
            }
        }
        Ok(())
    }

    pub fn next_state(&self, state: State, symbol: Symbol) -> Result<State, TuringMachineError> {
        Ok(self.next[self.slot(state, symbol)?])
    }

    /// Defines the transition out of `state` on `symbol`.
    pub fn put(
        &mut self,
        state: State,
        symbol: Symbol,
        next_state: State,
        replace: bool,
    ) -> Result<(), TuringMachineError> {
        let slot = self.slot(state, symbol)?;
        if next_state >= self.num_states() {
            return Err(TuringMachineError::InvalidTransition(format!(
                "Given next state({next_state}) isn't in the range of [0, {}].",
                self.num_states() - 1
            )));
        }
        if self.defined[slot] && !replace {
            return Err(TuringMachineError::InvalidTransition(format!(
                "A transition from state {state} on symbol index {symbol} has already been defined."
            )));
        }

        if !self.defined[slot] {
            self.defined[slot] = true;
            self.defined_count += 1;
        }
        self.next[slot] = next_state;
        Ok(())
    }

    pub fn put_transition(
        &mut self,
        state: State,
        symbol: &str,
        next_state: State,
        replace: bool,
    ) -> Result<(), TuringMachineError> {
        let index = self.input.index_of(symbol).ok_or_else(|| {
            TuringMachineError::InvalidTransition(format!("\"{symbol}\" isn't an input symbol."))
        })?;
        self.put(state, index, next_state, replace)
    }

    /// Restores the self-loop for `(state, symbol)`.
    pub fn reset(&mut self, state: State, symbol: Symbol) -> Result<State, TuringMachineError> {
        let slot = self.slot(state, symbol)?;
        if self.defined[slot] {
            self.defined[slot] = false;
            self.defined_count -= 1;
        }
        Ok(std::mem::replace(&mut self.next[slot], state))
    }

    /// Indices of the accepting states in ascending order.
    pub fn accepting_states(&self) -> Vec<State> {
        self.accepting
            .iter()
            .enumerate()
            .filter(|&(_, &accepting)| accepting)
            .map(|(state, _)| state)
            .collect()
    }

    fn check_input(&self, input: &[Symbol]) -> Result<(), TuringMachineError> {
        if !self.input.contains_all(input) {
            return Err(TuringMachineError::InvalidTestString(format!(
                "Given string({input:?}) isn't defined over the input alphabet of size {}.",
                self.input.len()
            )));
        }
        Ok(())
    }

    /// Decides `input`, returning whether it is accepted and how many symbols were consumed.
    ///
    /// When the answer cannot depend on the input it is returned without reading anything.
    pub fn accepts(&self, input: &[Symbol]) -> Result<(bool, u64), TuringMachineError> {
        self.decide(input, None)
    }

    /// Reads all of `input` starting from `state` instead of the start state.
    pub fn accepts_from(
        &self,
        input: &[Symbol],
        state: State,
    ) -> Result<(bool, u64), TuringMachineError> {
        self.check_state(state)?;
        self.check_input(input)?;

        Ok(self.read(input, state, None))
    }

    fn decide(
        &self,
        input: &[Symbol],
        mut tracer: Option<&mut dyn Tracer>,
    ) -> Result<(bool, u64), TuringMachineError> {
        self.check_input(input)?;

        let decided = if self.accepting_count == 0 {
            Some(false)
        } else if self.accepting_count == self.num_states() {
            Some(true)
        } else if self.defined_count == 0 {
            Some(self.accepting[0])
        } else {
            None
        };

        match decided {
            Some(accepted) => {
                if let Some(tracer) = tracer.as_deref_mut() {
                    tracer.trace(snapshot(input, 0, 0));
                }
                Ok((accepted, 0))
            }
            None => Ok(self.read(input, 0, tracer)),
        }
    }

    // The head is the position of the next symbol to read.
    fn read(
        &self,
        input: &[Symbol],
        mut state: State,
        mut tracer: Option<&mut dyn Tracer>,
    ) -> (bool, u64) {
        if let Some(tracer) = tracer.as_deref_mut() {
            tracer.trace(snapshot(input, state, 0));
        }

        for (position, &symbol) in input.iter().enumerate() {
            state = self.next[state * self.input.len() + symbol];
            if let Some(tracer) = tracer.as_deref_mut() {
                tracer.trace(snapshot(input, state, position + 1));
            }
        }

        (self.accepting[state], input.len() as u64)
    }
}

fn snapshot(input: &[Symbol], state: State, head: usize) -> Configuration {
    Configuration {
        state,
        tape: input.to_vec(),
        head,
        step: head as u64,
    }
}

impl Simulate for FiniteAutomaton {
    fn input_alphabet(&self) -> &InputAlphabet {
        &self.input
    }

    /// Bounds don't apply: an automaton always halts after reading its input.
    /// A tracer sees the input as the tape, once before reading and once per symbol read.
    fn run_input(
        &self,
        input: &[Symbol],
        _limits: &Limits,
        tracer: Option<&mut dyn Tracer>,
    ) -> Result<RunReport, TuringMachineError> {
        let (accepted, step_count) = self.decide(input, tracer)?;

        Ok(RunReport {
            outcome: if accepted {
                RunOutcome::Accepted
            } else {
                RunOutcome::Rejected
            },
            step_count,
            elapsed_ms: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{simulate, SimulationConfig};

    // Accepts strings with an even number of `b`s.
    fn even_bs() -> FiniteAutomaton {
        let mut dfa = FiniteAutomaton::new(2, &["a", "b"]).unwrap();
        dfa.set_accepting(0, true).unwrap();
        dfa.put_transition(0, "b", 1, false).unwrap();
        dfa.put_transition(1, "b", 0, false).unwrap();
        dfa
    }

    #[test]
    fn test_accepts_even_number_of_bs() {
        let dfa = even_bs();

        assert_eq!(dfa.accepts(&[]).unwrap(), (true, 0));
        assert_eq!(dfa.accepts(&[1, 0, 0]).unwrap(), (false, 3));
        assert_eq!(dfa.accepts(&[1, 0, 1]).unwrap(), (true, 3));
        assert!(dfa.accepts(&[2]).is_err());
    }

    #[test]
    fn test_everything_accepted_without_reading() {
        let mut dfa = FiniteAutomaton::new(3, &["0", "1"]).unwrap();
        for state in 0..3 {
            dfa.set_accepting(state, true).unwrap();
        }

        let report = simulate(&dfa, &SimulationConfig::default().with_length_range(0, 3), None)
            .unwrap();
        assert_eq!(report.tallies().accepted, 15);
        assert!(report.records().iter().all(|(_, r)| r.step_count == 0));
    }

    #[test]
    fn test_nothing_accepted_without_accepting_states() {
        let dfa = FiniteAutomaton::new(1, &["0"]).unwrap();
        assert_eq!(dfa.accepts(&[0, 0]).unwrap(), (false, 0));
    }

    #[test]
    fn test_no_transitions_decides_by_start_state() {
        let mut dfa = FiniteAutomaton::new(2, &["0"]).unwrap();
        dfa.set_accepting(0, true).unwrap();

        assert_eq!(dfa.accepts(&[0, 0, 0]).unwrap(), (true, 0));
    }

    #[test]
    fn test_transition_bookkeeping() {
        let mut dfa = even_bs();

        assert!(dfa.put(0, 1, 0, false).is_err());
        assert!(dfa.put(0, 0, 2, false).is_err());
        assert!(dfa.put_transition(0, "c", 0, false).is_err());
        dfa.put(0, 1, 0, true).unwrap();
        assert_eq!(dfa.defined_count(), 2);

        assert_eq!(dfa.reset(1, 1).unwrap(), 0);
        assert_eq!(dfa.next_state(1, 1).unwrap(), 1);
        assert_eq!(dfa.defined_count(), 1);

        dfa.set_accepting(0, false).unwrap();
        dfa.set_accepting(0, false).unwrap();
        assert_eq!(dfa.accepting_count(), 0);
        assert!(FiniteAutomaton::new(0, &["a"]).is_err());
    }

    #[test]
    fn test_accepts_from_any_state() {
        let dfa = even_bs();

        assert_eq!(dfa.accepts_from(&[], 1).unwrap(), (false, 0));
        assert_eq!(dfa.accepts_from(&[1], 1).unwrap(), (true, 1));
        assert_eq!(dfa.accepts_from(&[0, 1, 0], 0).unwrap(), (false, 3));
        assert!(matches!(
            dfa.accepts_from(&[0], 2),
            Err(TuringMachineError::InvalidState(_))
        ));
        assert!(matches!(
            dfa.accepts_from(&[2], 0),
            Err(TuringMachineError::InvalidTestString(_))
        ));
    }

    #[test]
    fn test_accepts_from_reads_past_shortcuts() {
        // Every state accepts, yet a start state still reads its whole input.
        let mut dfa = FiniteAutomaton::new(2, &["0"]).unwrap();
        dfa.set_accepting(0, true).unwrap();
        dfa.set_accepting(1, true).unwrap();

        assert_eq!(dfa.accepts(&[0, 0]).unwrap(), (true, 0));
        assert_eq!(dfa.accepts_from(&[0, 0], 1).unwrap(), (true, 2));
    }

    #[test]
    fn test_trace_follows_each_symbol() {
        let dfa = even_bs();
        let mut trace: Vec<Configuration> = Vec::new();

        let report = dfa
            .run_input(&[1, 0, 1], &Limits::default(), Some(&mut trace))
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Accepted);
        assert_eq!(report.step_count, 3);
        assert_eq!(trace.len(), 4);
        assert_eq!(
            trace.iter().map(|c| c.state).collect::<Vec<_>>(),
            vec![0, 1, 1, 0]
        );
        assert_eq!(trace[2].head, 2);
        assert_eq!(trace[2].step, 2);
        assert!(trace.iter().all(|c| c.tape == vec![1, 0, 1]));
    }

    #[test]
    fn test_shortcut_traces_the_start() {
        let dfa = FiniteAutomaton::new(1, &["0"]).unwrap();
        let mut trace: Vec<Configuration> = Vec::new();

        let report = simulate(
            &dfa,
            &SimulationConfig::default().with_length_range(0, 1),
            Some(&mut trace),
        )
        .unwrap();

        assert_eq!(report.tallies().rejected, 2);
        assert_eq!(trace.len(), 2);
        assert!(trace.iter().all(|c| c.step == 0 && c.state == 0));
    }

    #[test]
    fn test_accepting_states() {
        let mut dfa = FiniteAutomaton::new(4, &["0"]).unwrap();
        dfa.set_accepting(3, true).unwrap();
        dfa.set_accepting(1, true).unwrap();

        assert_eq!(dfa.accepting_states(), vec![1, 3]);
    }

    #[test]
    fn test_enumerating_an_automaton() {
        let dfa = even_bs();
        let report = simulate(&dfa, &SimulationConfig::default().with_length_range(0, 2), None)
            .unwrap();

        // "", "a", "aa", "bb" have an even number of b's.
        assert_eq!(report.tallies().accepted, 4);
        assert_eq!(report.tallies().rejected, 3);
    }
}
