//! Symbol registries. An [`InputAlphabet`] maps the symbols of test strings to dense indices;
//! an [`Alphabet`] extends it with work symbols and the special `leftend`/`blank` symbols to
//! form a tape alphabet.

use std::collections::{HashMap, HashSet};

use crate::types::{
    Symbol, TapeMode, TuringMachineError, MAX_TAPE_ALPHABET_SIZE, MIN_INPUT_ALPHABET_SIZE,
};

/// A sorted, prefix-free set of input symbols.
///
/// Prefix-freedom makes tokenizing a raw string unambiguous: reading greedily from the left,
/// at most one symbol can match at every position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputAlphabet {
    symbols: Vec<String>,
    index: HashMap<String, Symbol>,
}

impl InputAlphabet {
    /// Builds an input alphabet from the given symbols, sorting them.
    pub fn new<S: AsRef<str>>(symbols: &[S]) -> Result<Self, TuringMachineError> {
        Self::with_reserved(symbols, &[])
    }

    fn with_reserved<S: AsRef<str>>(
        symbols: &[S],
        reserved: &[&str],
    ) -> Result<Self, TuringMachineError> {
        if symbols.len() < MIN_INPUT_ALPHABET_SIZE {
            return Err(TuringMachineError::InvalidAlphabet(format!(
                "Given input alphabet size({}) is less than {}.",
                symbols.len(),
                MIN_INPUT_ALPHABET_SIZE
            )));
        }

        let mut sorted = check_symbols(symbols, reserved)?;
        sorted.sort();

        if let Some(pair) = sorted.windows(2).find(|w| w[1].starts_with(w[0].as_str())) {
            return Err(TuringMachineError::InvalidAlphabet(format!(
                "Given input alphabet isn't valid since \"{}\" is a prefix of \"{}\".",
                pair[0], pair[1]
            )));
        }

        let index = sorted
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();

        Ok(Self {
            symbols: sorted,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn index_of(&self, symbol: &str) -> Option<Symbol> {
        self.index.get(symbol).copied()
    }

    /// Returns the textual form of the symbol at `index`.
    pub fn symbol(&self, index: Symbol) -> Result<&str, TuringMachineError> {
        self.symbols.get(index).map(String::as_str).ok_or_else(|| {
            TuringMachineError::InvalidSymbol(format!(
                "Given input symbol index({index}) isn't in the range of [0, {}].",
                self.len() - 1
            ))
        })
    }

    /// Whether every index of `input` names an input symbol.
    pub fn contains_all(&self, input: &[Symbol]) -> bool {
        input.iter().all(|&s| s < self.len())
    }

    /// Splits `text` into input symbols, reading greedily from the left.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Symbol>, TuringMachineError> {
        let mut symbols = Vec::new();
        let mut rest = text;

        'outer: while !rest.is_empty() {
            for (start, c) in rest.char_indices() {
                let end = start + c.len_utf8();
                if let Some(index) = self.index_of(&rest[..end]) {
                    symbols.push(index);
                    rest = &rest[end..];
                    continue 'outer;
                }
            }

            return Err(TuringMachineError::InvalidTestString(format!(
                "Given string(\"{text}\") isn't defined over the input alphabet."
            )));
        }

        Ok(symbols)
    }

    /// Concatenates the textual forms of `input`.
    pub fn render(&self, input: &[Symbol]) -> Result<String, TuringMachineError> {
        input
            .iter()
            .map(|&s| self.symbol(s))
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.concat())
    }
}

/// A tape alphabet: the input alphabet first, then the remaining user symbols (sorted), then
/// the special symbols of the [`TapeMode`] with `blank` always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    mode: TapeMode,
    input: InputAlphabet,
    symbols: Vec<String>,
    index: HashMap<String, Symbol>,
}

impl Alphabet {
    /// Builds a tape alphabet whose input alphabet is the first `input_size` of `tape_symbols`.
    ///
    /// `tape_symbols` holds only the user symbols; the special symbols are appended.
    pub fn new<S: AsRef<str>>(
        tape_symbols: &[S],
        input_size: usize,
        mode: TapeMode,
    ) -> Result<Self, TuringMachineError> {
        let specials = mode.special_symbols();
        let tape_size = tape_symbols.len() + specials.len();

        if input_size < MIN_INPUT_ALPHABET_SIZE || input_size > tape_symbols.len() {
            return Err(TuringMachineError::InvalidAlphabet(format!(
                "Given input alphabet size({input_size}) isn't in the range of [{}, {}].",
                MIN_INPUT_ALPHABET_SIZE,
                tape_symbols.len()
            )));
        }
        if tape_size > MAX_TAPE_ALPHABET_SIZE {
            return Err(TuringMachineError::InvalidAlphabet(format!(
                "Given tape alphabet size({tape_size}) isn't in the range of [{}, {}].",
                input_size + specials.len(),
                MAX_TAPE_ALPHABET_SIZE
            )));
        }

        let user = check_symbols(tape_symbols, specials)?;
        let input = InputAlphabet::with_reserved(&user[..input_size], specials)?;

        let mut work = user[input_size..].to_vec();
        work.sort();

        let symbols: Vec<String> = input
            .symbols()
            .iter()
            .cloned()
            .chain(work)
            .chain(specials.iter().map(|s| s.to_string()))
            .collect();
        let index = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();

        Ok(Self {
            mode,
            input,
            symbols,
            index,
        })
    }

    pub fn mode(&self) -> TapeMode {
        self.mode
    }

    pub fn input(&self) -> &InputAlphabet {
        &self.input
    }

    /// Size of the whole tape alphabet, special symbols included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn input_len(&self) -> usize {
        self.input.len()
    }

    pub fn blank(&self) -> Symbol {
        self.len() - 1
    }

    /// Index of the left-end marker, if the tape mode has one.
    pub fn leftend(&self) -> Option<Symbol> {
        match self.mode {
            TapeMode::LeftEnd => Some(self.len() - 2),
            TapeMode::TwoWay => None,
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn index_of(&self, symbol: &str) -> Option<Symbol> {
        self.index.get(symbol).copied()
    }

    pub fn symbol(&self, index: Symbol) -> Result<&str, TuringMachineError> {
        self.symbols.get(index).map(String::as_str).ok_or_else(|| {
            TuringMachineError::InvalidSymbol(format!(
                "Given tape symbol index({index}) isn't in the range of [0, {}].",
                self.len() - 1
            ))
        })
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<Symbol>, TuringMachineError> {
        self.input.tokenize(text)
    }

    /// Renders tape contents with symbols separated by spaces.
    pub fn render_tape(&self, tape: &[Symbol]) -> Result<String, TuringMachineError> {
        tape.iter()
            .map(|&s| self.symbol(s))
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.join(" "))
    }
}

/// Checks user-supplied symbols, returning owned copies in their original order.
fn check_symbols<S: AsRef<str>>(
    symbols: &[S],
    reserved: &[&str],
) -> Result<Vec<String>, TuringMachineError> {
    let mut seen = HashSet::new();

    symbols
        .iter()
        .map(|s| {
            let symbol = s.as_ref();
            let lower = symbol.to_lowercase();
            let cause = if symbol.is_empty() {
                Some("it's the empty string")
            } else if symbol.chars().any(char::is_whitespace) {
                Some("it contains whitespace")
            } else if reserved.iter().any(|r| lower.contains(r)) {
                Some("it is/contains a special tape symbol")
            } else if !seen.insert(symbol) {
                Some("it has been defined more than once")
            } else {
                None
            };

            match cause {
                Some(cause) => Err(TuringMachineError::InvalidAlphabet(format!(
                    "\"{symbol}\" isn't valid since {cause}."
                ))),
                None => Ok(symbol.to_string()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_puts_input_first_and_blank_last() {
        let alphabet = Alphabet::new(&["Y", "b", "a", "X"], 2, TapeMode::LeftEnd).unwrap();

        // "Y" and "b" are the input symbols; sorted they become ["Y", "b"].
        assert_eq!(
            alphabet.symbols(),
            &["Y", "b", "X", "a", "leftend", "blank"]
        );
        assert_eq!(alphabet.input().symbols(), &["Y", "b"]);
        assert_eq!(alphabet.leftend(), Some(4));
        assert_eq!(alphabet.blank(), 5);
        assert_eq!(alphabet.index_of("a"), Some(3));
        assert_eq!(alphabet.input().index_of("a"), None);
    }

    #[test]
    fn test_two_way_has_no_leftend() {
        let alphabet = Alphabet::new(&["0", "1"], 2, TapeMode::TwoWay).unwrap();

        assert_eq!(alphabet.symbols(), &["0", "1", "blank"]);
        assert_eq!(alphabet.leftend(), None);
        assert_eq!(alphabet.blank(), 2);
    }

    #[test]
    fn test_rejects_reserved_and_malformed_symbols() {
        for bad in [
            vec!["0", "Blank"],
            vec!["0", "myleftend"],
            vec!["0", ""],
            vec!["0", "a b"],
            vec!["0", "0"],
        ] {
            let result = Alphabet::new(&bad, 1, TapeMode::LeftEnd);
            assert!(
                matches!(result, Err(TuringMachineError::InvalidAlphabet(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_leftend_is_allowed_without_marker() {
        assert!(Alphabet::new(&["leftend", "0"], 1, TapeMode::TwoWay).is_ok());
    }

    #[test]
    fn test_input_size_bounds() {
        assert!(Alphabet::new(&["0", "1"], 0, TapeMode::LeftEnd).is_err());
        assert!(Alphabet::new(&["0", "1"], 3, TapeMode::LeftEnd).is_err());

        let too_many: Vec<String> = (0..MAX_TAPE_ALPHABET_SIZE).map(|i| i.to_string()).collect();
        assert!(Alphabet::new(&too_many, 1, TapeMode::LeftEnd).is_err());
    }

    #[test]
    fn test_input_alphabet_must_be_prefix_free() {
        let result = InputAlphabet::new(&["ab", "a", "c"]);
        assert!(matches!(result, Err(TuringMachineError::InvalidAlphabet(_))));

        // Work symbols may share prefixes with input symbols.
        assert!(Alphabet::new(&["a", "b", "ab"], 2, TapeMode::LeftEnd).is_ok());
    }

    #[test]
    fn test_tokenize_multi_character_symbols() {
        let input = InputAlphabet::new(&["ab", "c", "da"]).unwrap();

        assert_eq!(input.tokenize("abcdaab").unwrap(), vec![0, 1, 2, 0]);
        assert_eq!(input.tokenize("").unwrap(), Vec::<Symbol>::new());
        assert!(matches!(
            input.tokenize("abd"),
            Err(TuringMachineError::InvalidTestString(_))
        ));
    }

    #[test]
    fn test_render_inverts_tokenize() {
        let input = InputAlphabet::new(&["ab", "c", "é"]).unwrap();
        let tokens = input.tokenize("céabé").unwrap();

        assert_eq!(input.render(&tokens).unwrap(), "céabé");
        assert!(input.render(&[3]).is_err());
    }

    #[test]
    fn test_render_tape() {
        let alphabet = Alphabet::new(&["0", "1"], 2, TapeMode::LeftEnd).unwrap();

        assert_eq!(
            alphabet.render_tape(&[2, 0, 1, 3]).unwrap(),
            "leftend 0 1 blank"
        );
        assert!(alphabet.render_tape(&[4]).is_err());
    }
}
