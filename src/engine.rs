//! Bounded execution of a [`TuringMachine`] on one tape.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::machine::TuringMachine;
use crate::tape::Tape;
use crate::types::{Configuration, Limits, RunOutcome, RunReport, State, Step};

/// Receives a snapshot of the machine before the first step and after every step.
pub trait Tracer {
    fn trace(&mut self, configuration: Configuration);
}

impl Tracer for Vec<Configuration> {
    fn trace(&mut self, configuration: Configuration) {
        self.push(configuration);
    }
}

/// A single run in progress. The machine is only borrowed; the tape belongs to the run.
#[derive(Debug, Clone)]
pub struct Execution<'m> {
    machine: &'m TuringMachine,
    state: State,
    tape: Tape,
    step_count: u64,
    elapsed: Duration,
}

impl<'m> Execution<'m> {
    pub fn new(machine: &'m TuringMachine, state: State, tape: Tape) -> Self {
        Self {
            machine,
            state,
            tape,
            step_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn configuration(&self) -> Configuration {
        Configuration {
            state: self.state,
            tape: self.tape.cells().to_vec(),
            head: self.tape.head(),
            step: self.step_count,
        }
    }

    /// The outcome, if the machine has entered a halting state.
    pub fn halted(&self) -> Option<RunOutcome> {
        if self.state == self.machine.accept_state() {
            Some(RunOutcome::Accepted)
        } else if self.state == self.machine.reject_state() {
            Some(RunOutcome::Rejected)
        } else {
            None
        }
    }

    /// Performs one transition unless the machine has halted.
    pub fn step(&mut self) -> Step {
        if let Some(outcome) = self.halted() {
            return Step::Halt(outcome);
        }

        let transition = self.machine.table().lookup(self.state, self.tape.current());
        self.tape.apply(
            transition.write,
            transition.direction,
            self.machine.include_still(),
        );
        self.state = transition.next_state;
        self.step_count += 1;

        Step::Continue
    }

    /// Steps until the machine halts or a bound stops it.
    ///
    /// The step bound is checked before a step: a run stopped by it has completed exactly
    /// `max_steps` steps. The time bound is checked after a step, so the step that crosses it
    /// is counted.
    pub fn run(mut self, limits: &Limits, mut tracer: Option<&mut dyn Tracer>) -> RunReport {
        if let Some(tracer) = tracer.as_deref_mut() {
            tracer.trace(self.configuration());
        }

        let outcome = loop {
            if let Some(outcome) = self.halted() {
                break outcome;
            }
            if self.step_count >= limits.max_steps {
                break RunOutcome::StepBoundExceeded;
            }

            let started = limits.max_time.map(|_| Instant::now());
            self.step();
            if let Some(started) = started {
                self.elapsed += started.elapsed();
            }

            if let Some(tracer) = tracer.as_deref_mut() {
                tracer.trace(self.configuration());
            }

            if let Some(max_time) = limits.max_time {
                if self.elapsed > max_time {
                    break RunOutcome::TimeBoundExceeded;
                }
            }
        };

        debug!(?outcome, steps = self.step_count, "run finished");

        RunReport {
            outcome,
            step_count: self.step_count,
            elapsed_ms: limits.max_time.map(|_| self.elapsed.as_millis() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, TapeMode};

    // 0 on `0` loops right, 0 on `1` accepts.
    fn find_one() -> TuringMachine {
        let mut machine = TuringMachine::new(3, &["0", "1"], 2, TapeMode::LeftEnd).unwrap();
        machine.put_transition(0, "0", 0, "0", "R", false).unwrap();
        machine.put_transition(0, "1", 1, "1", "R", false).unwrap();
        machine
    }

    #[test]
    fn test_step_halts_in_accept_state() {
        let machine = find_one();
        let mut execution = machine.execution(&[1]).unwrap();

        assert_eq!(execution.step(), Step::Continue);
        assert_eq!(execution.state(), machine.accept_state());
        assert_eq!(execution.step(), Step::Halt(RunOutcome::Accepted));
        assert_eq!(execution.step_count(), 1);
    }

    #[test]
    fn test_trace_records_every_step() {
        let machine = find_one();
        let mut trace: Vec<Configuration> = Vec::new();

        let report = machine
            .execution(&[0, 1])
            .unwrap()
            .run(&Limits::default(), Some(&mut trace));

        assert_eq!(report.outcome, RunOutcome::Accepted);
        assert_eq!(trace.len(), 3);
        assert_eq!(
            trace[0],
            Configuration {
                state: 0,
                tape: vec![2, 0, 1],
                head: 1,
                step: 0,
            }
        );
        assert_eq!(trace[2].state, 1);
        assert_eq!(trace[2].tape, vec![2, 0, 1, 3]);
        assert_eq!(trace[2].head, 3);
        assert_eq!(trace[2].step, 2);
    }

    #[test]
    fn test_step_bound_is_exact() {
        let machine = find_one();

        for max_steps in [0, 1, 5, 17] {
            let report = machine
                .execution(&[0; 20])
                .unwrap()
                .run(&Limits::default().with_max_steps(max_steps), None);

            assert_eq!(report.outcome, RunOutcome::StepBoundExceeded);
            assert_eq!(report.step_count, max_steps);
            assert_eq!(report.elapsed_ms, None);
        }
    }

    #[test]
    fn test_halting_on_the_last_allowed_step_wins() {
        let machine = find_one();
        let report = machine
            .execution(&[0, 1])
            .unwrap()
            .run(&Limits::default().with_max_steps(2), None);

        assert_eq!(report.outcome, RunOutcome::Accepted);
        assert_eq!(report.step_count, 2);
    }

    #[test]
    fn test_time_bound_counts_the_crossing_step() {
        // Never halts: the default transition on blank keeps moving right.
        let machine = find_one();
        let limits = Limits::default().with_max_time(Some(Duration::ZERO));

        let mut trace: Vec<Configuration> = Vec::new();
        let report = machine.execution(&[0]).unwrap().run(&limits, Some(&mut trace));

        // Any measurable step crosses a zero bound.
        assert_eq!(report.outcome, RunOutcome::TimeBoundExceeded);
        assert!(report.step_count >= 1);
        assert!(report.elapsed_ms.is_some());
        // The crossing step is traced like any other.
        assert_eq!(trace.len() as u64, report.step_count + 1);
        assert_eq!(trace.last().map(|c| c.step), Some(report.step_count));
    }

    #[test]
    fn test_step_bound_applies_before_time_bound() {
        let machine = find_one();
        let limits = Limits::default()
            .with_max_steps(0)
            .with_max_time(Some(Duration::ZERO));

        let report = machine.execution(&[0]).unwrap().run(&limits, None);
        assert_eq!(report.outcome, RunOutcome::StepBoundExceeded);
        assert_eq!(report.step_count, 0);
        assert_eq!(report.elapsed_ms, Some(0));
    }

    #[test]
    fn test_leftend_survives_a_left_moving_run() {
        // Walks left over `0`/`1` writing `1`, and bounces right off the marker forever.
        let mut machine = TuringMachine::new(3, &["0", "1"], 2, TapeMode::LeftEnd).unwrap();
        let leftend = machine.alphabet().leftend().unwrap();
        machine.put(0, 0, 0, 1, Direction::Left, false).unwrap();
        machine.put(0, 1, 0, 1, Direction::Left, false).unwrap();
        machine
            .put(0, leftend, 0, leftend, Direction::Right, false)
            .unwrap();

        let mut trace: Vec<Configuration> = Vec::new();
        let report = machine
            .execution(&[0, 1, 0])
            .unwrap()
            .run(&Limits::default().with_max_steps(200), Some(&mut trace));

        assert_eq!(report.outcome, RunOutcome::StepBoundExceeded);
        assert_eq!(trace.len(), 201);
        assert!(trace.iter().any(|c| c.head == 0));
        for configuration in &trace {
            assert_eq!(configuration.tape[0], leftend, "step {}", configuration.step);
            assert!(!configuration.tape[1..].contains(&leftend));
        }
    }

    #[test]
    fn test_two_way_left_extension() {
        let mut machine = TuringMachine::new(3, &["0"], 1, TapeMode::TwoWay).unwrap();
        let blank = machine.alphabet().blank();
        machine.put(0, 0, 0, 0, Direction::Left, false).unwrap();
        machine
            .put(0, blank, 1, 0, Direction::Still, false)
            .unwrap();

        let mut trace: Vec<Configuration> = Vec::new();
        let report = machine
            .execution(&[0])
            .unwrap()
            .run(&Limits::default(), Some(&mut trace));

        assert_eq!(report.outcome, RunOutcome::Accepted);
        assert_eq!(report.step_count, 2);
        assert_eq!(trace[1].tape, vec![1, 0]);
        assert_eq!(trace[1].head, 0);
        assert_eq!(trace[2].tape, vec![0, 0]);
    }
}
