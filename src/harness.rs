//! Exhaustive testing of a machine over every input string in a length range.
//!
//! Strings are enumerated like numerals over the input alphabet: the last position is the
//! least significant, and carrying out of the first position appends a new position. This
//! visits every string of one length, in lexicographic index order, before any longer string.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::alphabet::InputAlphabet;
use crate::engine::Tracer;
use crate::machine::TuringMachine;
use crate::types::{
    Limits, RunOutcome, RunReport, Symbol, TuringMachineError, DEFAULT_MAX_LENGTH,
    DEFAULT_MAX_STRING_COUNT, DEFAULT_MIN_LENGTH, MAX_STRINGS_COUNT,
};

/// Something that decides strings over an input alphabet within resource bounds.
pub trait Simulate {
    fn input_alphabet(&self) -> &InputAlphabet;

    fn run_input(
        &self,
        input: &[Symbol],
        limits: &Limits,
        tracer: Option<&mut dyn Tracer>,
    ) -> Result<RunReport, TuringMachineError>;
}

impl Simulate for TuringMachine {
    fn input_alphabet(&self) -> &InputAlphabet {
        self.alphabet().input()
    }

    fn run_input(
        &self,
        input: &[Symbol],
        limits: &Limits,
        tracer: Option<&mut dyn Tracer>,
    ) -> Result<RunReport, TuringMachineError> {
        self.run(input, limits, tracer)
    }
}

/// What to enumerate and how to bound each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub min_length: usize,
    pub max_length: usize,
    /// The first string tested.
    pub initial: Vec<Symbol>,
    /// How many strings to test at most. Zero tests nothing.
    pub max_string_count: usize,
    pub limits: Limits,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
            initial: Vec::new(),
            max_string_count: DEFAULT_MAX_STRING_COUNT,
            limits: Limits::default(),
        }
    }
}

impl SimulationConfig {
    /// Sets the length range, swapping the bounds if needed, and starts at its shortest string.
    pub fn with_length_range(mut self, min_length: usize, max_length: usize) -> Self {
        self.min_length = min_length.min(max_length);
        self.max_length = min_length.max(max_length);
        self.initial = min_string(self.min_length);
        self
    }

    pub fn with_initial(mut self, initial: Vec<Symbol>) -> Self {
        self.initial = initial;
        self
    }

    pub fn with_max_string_count(mut self, max_string_count: usize) -> Self {
        self.max_string_count = max_string_count;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Checks the configuration against an input alphabet of `input_size` symbols.
    ///
    /// An initial string outside the length range is an error when more than one string is
    /// to be tested; otherwise the range widens to `[0, len]`. The enumeration size is only
    /// estimated when the cap itself exceeds [`MAX_STRINGS_COUNT`].
    pub fn validate(&mut self, input_size: usize) -> Result<(), TuringMachineError> {
        if let Some(&symbol) = self.initial.iter().find(|&&s| s >= input_size) {
            return Err(TuringMachineError::InvalidTestString(format!(
                "Initial string contains symbol index {symbol}, but the input alphabet has {input_size} symbols."
            )));
        }

        if self.min_length > self.max_length {
            std::mem::swap(&mut self.min_length, &mut self.max_length);
        }

        let len = self.initial.len();
        if len < self.min_length || len > self.max_length {
            if self.max_string_count > 1 {
                return Err(TuringMachineError::InvalidTestString(format!(
                    "Initial string length({len}) isn't in the range of [{}, {}].",
                    self.min_length, self.max_length
                )));
            }
            self.min_length = 0;
            self.max_length = len;
        }

        if self.max_string_count > MAX_STRINGS_COUNT {
            let estimate = estimate_string_count(input_size, len, self.max_length);
            if estimate > MAX_STRINGS_COUNT as u128 {
                return Err(TuringMachineError::TooManyStrings(format!(
                    "Testing up to {estimate} strings exceeds the limit of {MAX_STRINGS_COUNT}."
                )));
            }
        }

        Ok(())
    }
}

/// The result of testing one string.
pub type TestRecord = RunReport;

/// Number of runs per outcome.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tallies {
    pub accepted: usize,
    pub rejected: usize,
    pub step_bound_exceeded: usize,
    pub time_bound_exceeded: usize,
}

impl Tallies {
    pub fn record(&mut self, outcome: RunOutcome) {
        match outcome {
            RunOutcome::Accepted => self.accepted += 1,
            RunOutcome::Rejected => self.rejected += 1,
            RunOutcome::StepBoundExceeded => self.step_bound_exceeded += 1,
            RunOutcome::TimeBoundExceeded => self.time_bound_exceeded += 1,
        }
    }

    pub fn get(&self, outcome: RunOutcome) -> usize {
        match outcome {
            RunOutcome::Accepted => self.accepted,
            RunOutcome::Rejected => self.rejected,
            RunOutcome::StepBoundExceeded => self.step_bound_exceeded,
            RunOutcome::TimeBoundExceeded => self.time_bound_exceeded,
        }
    }

    pub fn total(&self) -> usize {
        self.accepted + self.rejected + self.step_bound_exceeded + self.time_bound_exceeded
    }
}

/// The headline result of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Summary {
    /// No string was tested.
    NoResult,
    Single {
        input: Vec<Symbol>,
        record: TestRecord,
    },
    Aggregate(Tallies),
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    summary: Summary,
    tallies: Tallies,
    records: Vec<(Vec<Symbol>, TestRecord)>,
    index: HashMap<Vec<Symbol>, usize>,
    elapsed: Duration,
}

impl SimulationReport {
    fn new(records: Vec<(Vec<Symbol>, TestRecord)>, elapsed: Duration) -> Self {
        let mut tallies = Tallies::default();
        for (_, record) in &records {
            tallies.record(record.outcome);
        }

        let summary = match records.as_slice() {
            [] => Summary::NoResult,
            [(input, record)] => Summary::Single {
                input: input.clone(),
                record: *record,
            },
            _ => Summary::Aggregate(tallies),
        };
        let index = records
            .iter()
            .enumerate()
            .map(|(i, (input, _))| (input.clone(), i))
            .collect();

        Self {
            summary,
            tallies,
            records,
            index,
            elapsed,
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn tallies(&self) -> Tallies {
        self.tallies
    }

    pub fn tested(&self) -> usize {
        self.records.len()
    }

    /// Every tested string with its record, in enumeration order.
    pub fn records(&self) -> &[(Vec<Symbol>, TestRecord)] {
        &self.records
    }

    pub fn record(&self, input: &[Symbol]) -> Option<&TestRecord> {
        self.index.get(input).map(|&i| &self.records[i].1)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Builds a JSON report, rendering inputs as strings over `alphabet`.
    pub fn to_json(&self, alphabet: &InputAlphabet) -> Result<Value, TuringMachineError> {
        let records = self
            .records
            .iter()
            .map(|(input, record)| -> Result<Value, TuringMachineError> {
                Ok(json!({
                    "input": alphabet.render(input)?,
                    "outcome": record.outcome,
                    "step_count": record.step_count,
                    "elapsed_ms": record.elapsed_ms,
                }))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let summary = match &self.summary {
            Summary::NoResult => json!("NoResult"),
            Summary::Single { input, record } => json!({
                "Single": {
                    "input": alphabet.render(input)?,
                    "outcome": record.outcome,
                    "step_count": record.step_count,
                }
            }),
            Summary::Aggregate(tallies) => json!({ "Aggregate": tallies }),
        };

        Ok(json!({
            "summary": summary,
            "tested": self.tested(),
            "tallies": self.tallies,
            "elapsed_ms": self.elapsed.as_millis() as u64,
            "records": records,
        }))
    }
}

/// Runs `machine` on every string `config` describes.
///
/// `config` is validated on a copy; see [`SimulationConfig::validate`].
pub fn simulate<M: Simulate + ?Sized>(
    machine: &M,
    config: &SimulationConfig,
    mut tracer: Option<&mut dyn Tracer>,
) -> Result<SimulationReport, TuringMachineError> {
    let base = machine.input_alphabet().len();
    let mut config = config.clone();
    config.validate(base)?;

    let started = Instant::now();
    let mut records = Vec::new();

    let strings = StringEnumerator::new(config.initial.clone(), base, config.max_length)
        .take(config.max_string_count);
    for input in strings {
        let run_tracer = tracer.as_mut().map(|t| &mut **t as &mut dyn Tracer);
        let record = machine.run_input(&input, &config.limits, run_tracer)?;
        records.push((input, record));
    }

    let report = SimulationReport::new(records, started.elapsed());
    let tallies = report.tallies();
    info!(
        tested = report.tested(),
        accepted = tallies.accepted,
        rejected = tallies.rejected,
        step_bound_exceeded = tallies.step_bound_exceeded,
        time_bound_exceeded = tallies.time_bound_exceeded,
        "enumeration finished"
    );

    Ok(report)
}

/// Yields strings in enumeration order from a starting string up to a maximum length.
#[derive(Debug, Clone)]
pub struct StringEnumerator {
    next: Vec<Symbol>,
    base: usize,
    max_length: usize,
}

impl StringEnumerator {
    pub fn new(start: Vec<Symbol>, base: usize, max_length: usize) -> Self {
        Self {
            next: start,
            base,
            max_length,
        }
    }
}

impl Iterator for StringEnumerator {
    type Item = Vec<Symbol>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.len() > self.max_length {
            return None;
        }

        let current = self.next.clone();
        increment(&mut self.next, self.base);
        Some(current)
    }
}

/// Advances `string` to its successor in enumeration order.
pub fn increment(string: &mut Vec<Symbol>, base: usize) {
    for symbol in string.iter_mut().rev() {
        if *symbol + 1 < base {
            *symbol += 1;
            return;
        }
        *symbol = 0;
    }
    string.push(0);
}

pub fn is_min(string: &[Symbol]) -> bool {
    string.iter().all(|&s| s == 0)
}

pub fn is_max(string: &[Symbol], base: usize) -> bool {
    string.iter().all(|&s| s + 1 == base)
}

/// The first string of length `len`.
pub fn min_string(len: usize) -> Vec<Symbol> {
    vec![0; len]
}

/// The last string of length `len`.
pub fn max_string(len: usize, base: usize) -> Vec<Symbol> {
    vec![base.saturating_sub(1); len]
}

/// Number of strings of lengths `start..=max` over `base` symbols, saturating at `u128::MAX`.
pub fn estimate_string_count(base: usize, start: usize, max: usize) -> u128 {
    if start > max {
        return 0;
    }
    if base <= 1 {
        return base as u128 * (max - start + 1) as u128;
    }

    let base = base as u128;
    let mut power = (0..start).try_fold(1u128, |acc, _| acc.checked_mul(base));
    let mut total = 0u128;

    for _ in start..=max {
        match power {
            Some(p) => {
                total = total.saturating_add(p);
                power = p.checked_mul(base);
            }
            None => return u128::MAX,
        }
        if total == u128::MAX {
            break;
        }
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TapeMode;

    // Accepts any string containing a `1`; loops forever otherwise.
    fn find_one() -> TuringMachine {
        let mut machine = TuringMachine::new(3, &["0", "1"], 2, TapeMode::LeftEnd).unwrap();
        machine.put_transition(0, "0", 0, "0", "R", false).unwrap();
        machine.put_transition(0, "1", 1, "1", "R", false).unwrap();
        machine
    }

    #[test]
    fn test_enumeration_order() {
        let strings: Vec<_> = StringEnumerator::new(Vec::new(), 2, 2).collect();

        assert_eq!(
            strings,
            vec![
                vec![],
                vec![0],
                vec![1],
                vec![0, 0],
                vec![0, 1],
                vec![1, 0],
                vec![1, 1],
            ]
        );
    }

    #[test]
    fn test_enumeration_covers_every_string_once() {
        let strings: Vec<_> = StringEnumerator::new(Vec::new(), 3, 3).collect();
        assert_eq!(strings.len(), 1 + 3 + 9 + 27);

        for len in 0..=3 {
            let of_len = strings.iter().filter(|s| s.len() == len).count();
            assert_eq!(of_len, 3usize.pow(len as u32));
        }

        // Shorter strings come first; equal lengths are in increasing index order.
        for pair in strings.windows(2) {
            assert!((pair[0].len(), &pair[0]) < (pair[1].len(), &pair[1]));
        }
    }

    #[test]
    fn test_enumeration_with_unary_alphabet() {
        let strings: Vec<_> = StringEnumerator::new(vec![0], 1, 3).collect();
        assert_eq!(strings, vec![vec![0], vec![0, 0], vec![0, 0, 0]]);
    }

    #[test]
    fn test_increment_helpers() {
        let mut string = vec![0, 1, 1];
        increment(&mut string, 2);
        assert_eq!(string, vec![1, 0, 0]);

        let mut string = max_string(2, 3);
        assert!(is_max(&string, 3));
        increment(&mut string, 3);
        assert_eq!(string, min_string(3));
        assert!(is_min(&string));

        let mut empty = Vec::new();
        increment(&mut empty, 2);
        assert_eq!(empty, vec![0]);
    }

    #[test]
    fn test_estimate_string_count() {
        assert_eq!(estimate_string_count(2, 0, 2), 7);
        assert_eq!(estimate_string_count(3, 2, 3), 9 + 27);
        assert_eq!(estimate_string_count(1, 0, 9), 10);
        assert_eq!(estimate_string_count(2, 3, 2), 0);
        assert_eq!(estimate_string_count(1000, 0, 100), u128::MAX);
    }

    #[test]
    fn test_guard_only_applies_above_ceiling() {
        let mut huge = SimulationConfig::default()
            .with_length_range(0, 20)
            .with_max_string_count(MAX_STRINGS_COUNT + 1);
        assert!(matches!(
            huge.validate(2),
            Err(TuringMachineError::TooManyStrings(_))
        ));

        // The cap itself keeps the work bounded.
        let mut capped = SimulationConfig::default()
            .with_length_range(0, 20)
            .with_max_string_count(MAX_STRINGS_COUNT);
        assert!(capped.validate(2).is_ok());

        let mut small = SimulationConfig::default()
            .with_length_range(0, 5)
            .with_max_string_count(MAX_STRINGS_COUNT + 1);
        assert!(small.validate(2).is_ok());
    }

    #[test]
    fn test_initial_string_outside_range() {
        let mut config = SimulationConfig::default()
            .with_length_range(0, 2)
            .with_initial(vec![0, 1, 1])
            .with_max_string_count(1);
        config.validate(2).unwrap();
        assert_eq!((config.min_length, config.max_length), (0, 3));

        let mut config = config.with_length_range(0, 2).with_initial(vec![0, 1, 1]);
        config.max_string_count = 2;
        assert!(matches!(
            config.validate(2),
            Err(TuringMachineError::InvalidTestString(_))
        ));

        let mut foreign = SimulationConfig::default().with_initial(vec![2]);
        assert!(foreign.validate(2).is_err());
    }

    #[test]
    fn test_length_range_is_normalized() {
        let config = SimulationConfig::default().with_length_range(4, 1);

        assert_eq!((config.min_length, config.max_length), (1, 4));
        assert_eq!(config.initial, vec![0]);
    }

    #[test]
    fn test_simulate_aggregate() {
        let machine = find_one();
        let config = SimulationConfig::default()
            .with_length_range(0, 2)
            .with_limits(Limits::default().with_max_steps(10));

        let report = simulate(&machine, &config, None).unwrap();

        assert_eq!(report.tested(), 7);
        let tallies = report.tallies();
        assert_eq!(tallies.accepted, 4);
        assert_eq!(tallies.step_bound_exceeded, 3);
        assert_eq!(tallies.total(), 7);
        assert_eq!(report.summary(), &Summary::Aggregate(tallies));

        let record = report.record(&[0, 1]).unwrap();
        assert_eq!(record.outcome, RunOutcome::Accepted);
        assert_eq!(record.step_count, 2);
        assert_eq!(
            report.record(&[0, 0]).unwrap().outcome,
            RunOutcome::StepBoundExceeded
        );
        assert!(report.record(&[0, 0, 0]).is_none());
    }

    #[test]
    fn test_simulate_respects_count() {
        let machine = find_one();
        let config = SimulationConfig::default()
            .with_length_range(0, 5)
            .with_max_string_count(3)
            .with_limits(Limits::default().with_max_steps(10));

        let report = simulate(&machine, &config, None).unwrap();
        let inputs: Vec<_> = report.records().iter().map(|(s, _)| s.clone()).collect();
        assert_eq!(inputs, vec![vec![], vec![0], vec![1]]);
    }

    #[test]
    fn test_single_and_empty_summaries() {
        let machine = find_one();

        let single = SimulationConfig::default()
            .with_initial(vec![1, 1])
            .with_max_string_count(1);
        let report = simulate(&machine, &single, None).unwrap();
        match report.summary() {
            Summary::Single { input, record } => {
                assert_eq!(input, &vec![1, 1]);
                assert_eq!(record.outcome, RunOutcome::Accepted);
                assert_eq!(record.step_count, 1);
            }
            other => panic!("Expected a single result, got {other:?}"),
        }

        let none = SimulationConfig::default().with_max_string_count(0);
        let report = simulate(&machine, &none, None).unwrap();
        assert_eq!(report.summary(), &Summary::NoResult);
        assert_eq!(report.tested(), 0);
    }

    #[test]
    fn test_json_report() {
        let machine = find_one();
        let config = SimulationConfig::default()
            .with_length_range(1, 1)
            .with_limits(Limits::default().with_max_steps(3));

        let report = simulate(&machine, &config, None).unwrap();
        let value = report.to_json(machine.input_alphabet()).unwrap();

        assert_eq!(value["tested"], 2);
        assert_eq!(value["tallies"]["accepted"], 1);
        assert_eq!(value["records"][0]["input"], "0");
        assert_eq!(value["records"][0]["outcome"], "StepBoundExceeded");
        assert_eq!(value["records"][1]["outcome"], "Accepted");
        assert_eq!(value["summary"]["Aggregate"]["step_bound_exceeded"], 1);
    }
}
