//! The working tape of a single run.

use crate::alphabet::Alphabet;
use crate::types::{Direction, Symbol, TapeMode, TuringMachineError};

/// A tape that grows on demand. Cells beyond the end read as blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<Symbol>,
    head: usize,
    tape_size: usize,
    blank: Symbol,
    leftend: Option<Symbol>,
}

impl Tape {
    /// Loads `input` onto a fresh tape with the head at the canonical start position.
    ///
    /// With a left-end marker the marker occupies position 0 and the head starts at 1,
    /// otherwise the input starts at position 0 under the head.
    pub fn from_input(input: &[Symbol], alphabet: &Alphabet) -> Result<Self, TuringMachineError> {
        if !alphabet.input().contains_all(input) {
            return Err(TuringMachineError::InvalidTestString(format!(
                "Given string({input:?}) isn't defined over the input alphabet of size {}.",
                alphabet.input_len()
            )));
        }

        let mode = alphabet.mode();
        let cells = match alphabet.leftend() {
            Some(leftend) => std::iter::once(leftend)
                .chain(input.iter().copied())
                .collect(),
            None => input.to_vec(),
        };

        Ok(Self {
            cells,
            head: mode.initial_head(),
            tape_size: alphabet.len(),
            blank: alphabet.blank(),
            leftend: alphabet.leftend(),
        })
    }

    /// Moves the head to `head`, padding the tape with blanks when needed.
    pub fn with_head(mut self, head: usize) -> Self {
        self.head = head;
        self.ensure(head);
        self
    }

    fn ensure(&mut self, pos: usize) {
        if pos >= self.cells.len() {
            self.cells.resize(pos + 1, self.blank);
        }
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn cells(&self) -> &[Symbol] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn mode(&self) -> TapeMode {
        match self.leftend {
            Some(_) => TapeMode::LeftEnd,
            None => TapeMode::TwoWay,
        }
    }

    pub fn read(&self, pos: usize) -> Symbol {
        self.cells.get(pos).copied().unwrap_or(self.blank)
    }

    /// Reads the symbol under the head.
    pub fn current(&self) -> Symbol {
        self.read(self.head)
    }

    /// Writes `symbol` at `pos`, extending the tape with blanks when needed.
    pub fn write(&mut self, pos: usize, symbol: Symbol) -> Result<(), TuringMachineError> {
        if symbol >= self.tape_size {
            return Err(TuringMachineError::InvalidSymbol(format!(
                "Given tape symbol index({symbol}) isn't in the range of [0, {}].",
                self.tape_size - 1
            )));
        }
        if self.leftend.is_some() && pos == 0 && Some(symbol) != self.leftend {
            return Err(TuringMachineError::LeftendViolation(
                "The left-end marker at position 0 can't be overwritten.".to_string(),
            ));
        }

        self.ensure(pos);
        self.cells[pos] = symbol;
        Ok(())
    }

    /// Writes under the head and moves it. The caller guarantees `write` is in range.
    pub(crate) fn apply(&mut self, write: Symbol, direction: Direction, include_still: bool) {
        self.ensure(self.head);
        self.cells[self.head] = write;

        match direction {
            Direction::Still if include_still => {}
            // A stored Still is only reachable after the capability was switched off.
            Direction::Right | Direction::Still => {
                self.head += 1;
                self.ensure(self.head);
            }
            Direction::Left => {
                if self.head > 0 {
                    self.head -= 1;
                } else if self.leftend.is_none() {
                    self.cells.insert(0, self.blank);
                }
            }
        }
    }
}
