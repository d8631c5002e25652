//! This module provides the parser for machine descriptions, utilizing the `pest` crate.
//!
//! A description is line oriented, with fields separated by exactly one space:
//!
//! ```text
//! numStates tapeAlphabetSize inputAlphabetSize
//! symbol symbol ...                  (the user tape symbols, input symbols first)
//! numTransitions
//! state read nextState write L|R|S   (numTransitions lines)
//! settings                           (optional)
//! comments ...
//! ```
//!
//! The settings line reads `maxStringCount [maxLength | minLength maxLength [maxSteps
//! [initialString [trace [timeLimit|maxTimeMs [maxTimeMs]]]]]]`, where any field may be
//! `default`. Finite automata use the layout described on [`parse_automaton`].

use std::str::FromStr;
use std::time::Duration;

use pest::{
    error::{Error, ErrorVariant},
    iterators::Pair,
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;

use crate::alphabet::InputAlphabet;
use crate::automaton::{check_automaton_states, FiniteAutomaton};
use crate::harness::{min_string, SimulationConfig};
use crate::machine::TuringMachine;
use crate::table::check_num_states;
use crate::types::{
    TapeMode, TuringMachineError, DEFAULT, DEFAULT_MAX_LENGTH, DEFAULT_MAX_PROCESS_TIME_MS,
    DEFAULT_MAX_STRING_COUNT, DEFAULT_MIN_LENGTH, MAX_DESCRIPTION_SIZE, MAX_PROCESS_TIME_MS,
};

/// Derives a `PestParser` for the description grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct DescriptionParser;

const MAX_SETTINGS_FIELDS: usize = 8;
const MAX_AUTOMATON_SETTINGS_FIELDS: usize = 4;

/// A machine together with the enumeration settings stored alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineDescription {
    pub machine: TuringMachine,
    pub config: SimulationConfig,
    /// Whether runs should be traced.
    pub trace: bool,
    /// Free-form lines following the settings line.
    pub comments: String,
}

/// A finite automaton together with the enumeration settings stored alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomatonDescription {
    pub automaton: FiniteAutomaton,
    pub config: SimulationConfig,
    pub comments: String,
}

/// Parses a description for a machine with a left-end marker.
pub fn parse(input: &str) -> Result<MachineDescription, TuringMachineError> {
    parse_with_mode(input, TapeMode::default())
}

/// Parses the given description into a machine running on a tape of the given `mode`.
///
/// # Returns
///
/// * `Ok(MachineDescription)` if the description is well formed.
/// * `Err(TuringMachineError::ParseError)` if a line isn't laid out as expected.
/// * Any other `TuringMachineError` for semantic problems, with the line number in its cause.
pub fn parse_with_mode(
    input: &str,
    mode: TapeMode,
) -> Result<MachineDescription, TuringMachineError> {
    let mut lines = Lines::new(parse_lines(input)?);

    // numStates tapeAlphabetSize inputAlphabetSize
    let (number, header) = lines.expect("header")?;
    let fields = expect_fields(&header, 3, "header")?;
    let num_states: usize = number_field(fields[0], "number of states", number)?;
    let tape_size: usize = number_field(fields[1], "tape alphabet size", number)?;
    let input_size: usize = number_field(fields[2], "input alphabet size", number)?;
    check_num_states(num_states).map_err(|e| e.on_line(number))?;

    let specials = mode.special_symbols().len();
    let user_size = tape_size.checked_sub(specials).ok_or_else(|| {
        TuringMachineError::InvalidAlphabet(format!(
            "Given tape alphabet size({tape_size}) doesn't leave room for the {specials} special symbol(s)."
        ))
        .on_line(number)
    })?;

    // tape symbols
    let (number, symbols) = lines.expect("tape symbols")?;
    let symbols = expect_fields(&symbols, user_size, "tape symbols")?;
    let mut machine =
        TuringMachine::new(num_states, &symbols, input_size, mode).map_err(|e| e.on_line(number))?;

    // transitions
    let (number, count) = lines.expect("transition count")?;
    let count: usize =
        number_field(expect_fields(&count, 1, "transition count")?[0], "number of transitions", number)?;

    for _ in 0..count {
        let (number, line) = lines.expect("transition")?;
        let fields = expect_fields(&line, 5, "transition")?;
        let state = number_field(fields[0], "initial state", number)?;
        let next_state = number_field(fields[2], "next state", number)?;

        machine
            .put_transition(state, fields[1], next_state, fields[3], fields[4], false)
            .map_err(|e| e.on_line(number))?;
    }

    let (config, trace) = match lines.next_line() {
        Some((number, line)) => {
            let settings = parse_settings(&line, machine.alphabet().input(), number)?;
            (settings.config, settings.trace)
        }
        None => (SimulationConfig::default(), false),
    };

    Ok(MachineDescription {
        machine,
        config,
        trace,
        comments: lines.rest(),
    })
}

/// Parses an automaton description:
///
/// ```text
/// numStates inputAlphabetSize numAcceptingStates numTransitions
/// symbol symbol ...                  (the input alphabet)
/// state state ...                    (accepting states, empty when there are none)
/// state read nextState               (numTransitions lines)
/// settings                           (optional)
/// comments ...
/// ```
pub fn parse_automaton(input: &str) -> Result<AutomatonDescription, TuringMachineError> {
    let mut lines = Lines::new(parse_lines(input)?);

    // numStates inputAlphabetSize numAcceptingStates numTransitions
    let (number, header) = lines.expect("header")?;
    let fields = expect_fields(&header, 4, "header")?;
    let num_states: usize = number_field(fields[0], "number of states", number)?;
    let input_size: usize = number_field(fields[1], "input alphabet size", number)?;
    let accepting_count: usize = number_field(fields[2], "number of accepting states", number)?;
    let count: usize = number_field(fields[3], "number of transitions", number)?;
    check_automaton_states(num_states).map_err(|e| e.on_line(number))?;
    if accepting_count > num_states {
        return Err(TuringMachineError::InvalidConfig(format!(
            "Given number of accepting states({accepting_count}) isn't in the range of [0, {num_states}]."
        ))
        .on_line(number));
    }

    // input alphabet
    let (number, symbols) = lines.expect("input alphabet")?;
    let symbols = expect_fields(&symbols, input_size, "input alphabet")?;
    let mut automaton =
        FiniteAutomaton::new(num_states, &symbols).map_err(|e| e.on_line(number))?;

    // accepting states
    let (number, accepting) = lines.expect("accepting states")?;
    if accepting_count == 0 {
        if !accepting.as_str().is_empty() {
            return Err(parse_error(
                "Expected an empty line when there are no accepting states",
                accepting.as_span(),
            ));
        }
    } else {
        for text in expect_fields(&accepting, accepting_count, "accepting states")? {
            let state: usize = number_field(text, "accepting state", number)?;
            if automaton.is_accepting(state).map_err(|e| e.on_line(number))? {
                return Err(TuringMachineError::InvalidState(format!(
                    "State {state} has been defined to be an accepting state more than once."
                ))
                .on_line(number));
            }
            automaton
                .set_accepting(state, true)
                .map_err(|e| e.on_line(number))?;
        }
    }

    // transitions
    for _ in 0..count {
        let (number, line) = lines.expect("transition")?;
        let fields = expect_fields(&line, 3, "transition")?;
        let state = number_field(fields[0], "initial state", number)?;
        let next_state = number_field(fields[2], "next state", number)?;

        automaton
            .put_transition(state, fields[1], next_state, false)
            .map_err(|e| e.on_line(number))?;
    }

    let config = match lines.next_line() {
        Some((number, line)) => parse_automaton_settings(&line, automaton.alphabet(), number)?,
        None => SimulationConfig::default(),
    };

    Ok(AutomatonDescription {
        automaton,
        config,
        comments: lines.rest(),
    })
}

fn parse_lines(input: &str) -> Result<Pair<'_, Rule>, TuringMachineError> {
    if input.len() > MAX_DESCRIPTION_SIZE {
        return Err(TuringMachineError::InvalidConfig(format!(
            "Description size({}) exceeds the limit of {MAX_DESCRIPTION_SIZE} bytes.",
            input.len()
        )));
    }

    DescriptionParser::parse(Rule::description, input)
        .map_err(|e| TuringMachineError::ParseError(e.into()))?
        .next()
        .ok_or_else(|| TuringMachineError::InvalidConfig("Description is empty.".to_string()))
}

/// Line pairs of a parsed description, numbered from 1.
struct Lines<'i> {
    lines: Vec<Pair<'i, Rule>>,
    next: usize,
}

impl<'i> Lines<'i> {
    fn new(root: Pair<'i, Rule>) -> Self {
        Self {
            lines: root
                .into_inner()
                .filter(|p| p.as_rule() == Rule::line)
                .collect(),
            next: 0,
        }
    }

    fn next_line(&mut self) -> Option<(usize, Pair<'i, Rule>)> {
        let line = self.lines.get(self.next)?.clone();
        self.next += 1;
        Some((self.next, line))
    }

    fn expect(&mut self, what: &str) -> Result<(usize, Pair<'i, Rule>), TuringMachineError> {
        let number = self.next + 1;
        self.next_line().ok_or_else(|| {
            TuringMachineError::InvalidConfig(format!(
                "Given machine description didn't have a {what} line (line {number})."
            ))
        })
    }

    fn rest(self) -> String {
        let text: Vec<&str> = self.lines[self.next..].iter().map(|p| p.as_str()).collect();
        text.join("\n").trim_end_matches(['\n', '\r']).to_string()
    }
}

struct Settings {
    config: SimulationConfig,
    trace: bool,
}

/// Parses the optional settings line. An empty line keeps every default.
fn parse_settings(
    line: &Pair<Rule>,
    alphabet: &InputAlphabet,
    number: usize,
) -> Result<Settings, TuringMachineError> {
    let mut settings = Settings {
        config: SimulationConfig::default(),
        trace: false,
    };
    let fields = settings_fields(line, MAX_SETTINGS_FIELDS)?;
    if fields.is_empty() {
        return Ok(settings);
    }

    let mut config = parse_range(&fields, number)?;
    let mut time_limit = false;
    let mut max_time_ms = DEFAULT_MAX_PROCESS_TIME_MS;

    if config.max_string_count != 0 {
        if let Some(steps) = number_at(&fields, 3, "max steps", number)? {
            config.limits.max_steps = steps;
        }
        if let Some(text) = field(&fields, 4) {
            config.initial = alphabet.tokenize(text).map_err(|e| e.on_line(number))?;
        }
        if let Some(text) = field(&fields, 5) {
            settings.trace = parse_bool(text).ok_or_else(|| {
                TuringMachineError::InvalidConfig(format!(
                    "Given trace flag({text}) isn't a valid boolean."
                ))
                .on_line(number)
            })?;
        }
        if let Some(text) = field(&fields, 6) {
            match parse_bool(text) {
                Some(enabled) => time_limit = enabled,
                // A lone seventh field may give the time bound directly.
                None if fields.len() == 7 => {
                    max_time_ms = number_field(text, "max process time", number)?;
                    time_limit = true;
                }
                None => {
                    return Err(TuringMachineError::InvalidConfig(format!(
                        "Given time limit flag({text}) isn't a valid boolean."
                    ))
                    .on_line(number))
                }
            }
        }
        if time_limit {
            if let Some(ms) = number_at(&fields, 7, "max process time", number)? {
                max_time_ms = ms;
            }
        }
    }

    if max_time_ms > MAX_PROCESS_TIME_MS {
        return Err(TuringMachineError::InvalidConfig(format!(
            "Given max process time({max_time_ms}) isn't in the range of [0, {MAX_PROCESS_TIME_MS}]."
        ))
        .on_line(number));
    }
    config.limits.max_time = time_limit.then(|| Duration::from_millis(max_time_ms));

    config
        .validate(alphabet.len())
        .map_err(|e| e.on_line(number))?;
    settings.config = config;

    Ok(settings)
}

/// Parses an automaton's settings line: `maxStringCount [maxLength | minLength maxLength
/// [initialString]]`.
fn parse_automaton_settings(
    line: &Pair<Rule>,
    alphabet: &InputAlphabet,
    number: usize,
) -> Result<SimulationConfig, TuringMachineError> {
    let fields = settings_fields(line, MAX_AUTOMATON_SETTINGS_FIELDS)?;
    if fields.is_empty() {
        return Ok(SimulationConfig::default());
    }

    let mut config = parse_range(&fields, number)?;
    if config.max_string_count != 0 {
        if let Some(text) = field(&fields, 3) {
            config.initial = alphabet.tokenize(text).map_err(|e| e.on_line(number))?;
        }
    }

    config
        .validate(alphabet.len())
        .map_err(|e| e.on_line(number))?;
    Ok(config)
}

/// Splits a settings line into at most `max` fields; an empty line has none.
fn settings_fields<'i>(
    line: &Pair<'i, Rule>,
    max: usize,
) -> Result<Vec<&'i str>, TuringMachineError> {
    if line.as_str().is_empty() {
        return Ok(Vec::new());
    }

    let fields = record_fields(line)?;
    if fields.len() > max {
        return Err(parse_error(
            &format!("Expected at most {max} settings fields, found {}", fields.len()),
            line.as_span(),
        ));
    }
    Ok(fields)
}

/// Reads the string count and length bounds that open every settings line.
///
/// A count of 0 ignores the remaining fields.
fn parse_range(fields: &[&str], number: usize) -> Result<SimulationConfig, TuringMachineError> {
    let mut config = SimulationConfig {
        max_string_count: number_at(fields, 0, "max string count", number)?
            .unwrap_or(DEFAULT_MAX_STRING_COUNT),
        ..SimulationConfig::default()
    };
    if config.max_string_count == 0 {
        return Ok(config);
    }

    if fields.len() == 2 {
        config.max_length =
            number_at(fields, 1, "max length", number)?.unwrap_or(DEFAULT_MAX_LENGTH);
    }
    if fields.len() >= 3 {
        let first = number_at(fields, 1, "first length bound", number)?.unwrap_or(DEFAULT_MIN_LENGTH);
        let second =
            number_at(fields, 2, "second length bound", number)?.unwrap_or(DEFAULT_MAX_LENGTH);
        config.min_length = first.min(second);
        config.max_length = first.max(second);
        config.initial = min_string(config.min_length);
    }

    Ok(config)
}

/// The field at `index`, unless it is absent or `default`.
fn field<'i>(fields: &[&'i str], index: usize) -> Option<&'i str> {
    fields.get(index).copied().filter(|f| !is_default(f))
}

fn number_at<T: FromStr>(
    fields: &[&str],
    index: usize,
    name: &str,
    line: usize,
) -> Result<Option<T>, TuringMachineError> {
    field(fields, index)
        .map(|f| number_field(f, name, line))
        .transpose()
}

/// Creates a `TuringMachineError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> TuringMachineError {
    TuringMachineError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Returns the fields of a record line.
fn record_fields<'i>(line: &Pair<'i, Rule>) -> Result<Vec<&'i str>, TuringMachineError> {
    match line.clone().into_inner().next() {
        Some(record) if record.as_rule() == Rule::record => {
            Ok(record.into_inner().map(|field| field.as_str()).collect())
        }
        _ => Err(parse_error(
            "Expected fields separated by single spaces",
            line.as_span(),
        )),
    }
}

fn expect_fields<'i>(
    line: &Pair<'i, Rule>,
    count: usize,
    what: &str,
) -> Result<Vec<&'i str>, TuringMachineError> {
    let fields = record_fields(line)?;
    if fields.len() != count {
        return Err(parse_error(
            &format!("Expected {count} field(s) for the {what}, found {}", fields.len()),
            line.as_span(),
        ));
    }
    Ok(fields)
}

fn number_field<T: FromStr>(
    field: &str,
    name: &str,
    line: usize,
) -> Result<T, TuringMachineError> {
    field.parse().map_err(|_| {
        TuringMachineError::InvalidConfig(format!("Given {name}({field}) isn't a valid integer."))
            .on_line(line)
    })
}

fn is_default(field: &str) -> bool {
    field.eq_ignore_ascii_case(DEFAULT)
}

fn parse_bool(field: &str) -> Option<bool> {
    match field.to_ascii_lowercase().as_str() {
        "t" | "true" => Some(true),
        "f" | "false" => Some(false),
        _ => None,
    }
}
