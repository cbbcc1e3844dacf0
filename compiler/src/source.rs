use std::fmt;
use std::str::CharIndices;

use thiserror::Error;

/// A location in the source text.
///
/// All fields are 0-based. `offset` is a byte offset into the source, so a
/// span can slice the original text directly; `column` counts characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub offset: usize,
    pub line:   usize,
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Position {
        Position { offset, line, column }
    }
}

/// Rendered 1-based, the way editors count.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A half-open source range: `end` is the position just past the last
/// character covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end:   Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Span {
        Span { start, end }
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start.offset..self.end.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("end of input")]
pub struct EndOfInput;

/// A cursor over characters that knows where it is.
///
/// `current` is `None` once the cursor has moved past the last character (or
/// immediately, for empty input).
pub trait CharStream {
    fn current(&self) -> Option<char>;
    fn position(&self) -> Position;
    fn advance(&mut self) -> Result<(), EndOfInput>;
}

/// [`CharStream`] over an in-memory string.
pub struct SourceChars<'a> {
    chars:    CharIndices<'a>,
    len:      usize,
    current:  Option<char>,
    position: Position,
}

impl<'a> SourceChars<'a> {
    pub fn new(text: &'a str) -> SourceChars<'a> {
        let mut chars = text.char_indices();
        let current = chars.next().map(|(_, ch)| ch);
        SourceChars {
            chars,
            len: text.len(),
            current,
            position: Position::default(),
        }
    }
}

impl<'a> CharStream for SourceChars<'a> {
    fn current(&self) -> Option<char> {
        self.current
    }

    fn position(&self) -> Position {
        self.position
    }

    fn advance(&mut self) -> Result<(), EndOfInput> {
        let prev = self.current.ok_or(EndOfInput)?;

        if prev == '\n' {
            self.position.line += 1;
            self.position.column = 0;
        } else {
            self.position.column += 1;
        }

        match self.chars.next() {
            Some((offset, ch)) => {
                self.position.offset = offset;
                self.current = Some(ch);
                Ok(())
            }
            None => {
                self.position.offset = self.len;
                self.current = None;
                Err(EndOfInput)
            }
        }
    }
}
