use thiserror::Error;

use crate::error::Diagnostic;
use crate::ring_buffer::RingBuffer;
use crate::source::{CharStream, SourceChars};
use crate::tokenizer::{Token, Tokenizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("end of token stream")]
pub struct EndOfStream;

/// Tokens with arbitrary lookahead.
///
/// Lexical errors met while pulling tokens are set aside (see
/// [`take_diagnostics`](TokenStream::take_diagnostics)) and the stream
/// carries on with the next good token.
pub struct TokenStream<S> {
    tokenizer:   Tokenizer<S>,
    buffer:      RingBuffer<Token>,
    exhausted:   bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TokenStream<SourceChars<'a>> {
    pub fn from_text(text: &'a str) -> Self {
        TokenStream::new(Tokenizer::from_text(text))
    }
}

impl<S: CharStream> TokenStream<S> {
    pub fn new(tokenizer: Tokenizer<S>) -> Self {
        TokenStream {
            tokenizer,
            buffer: RingBuffer::new(),
            exhausted: false,
            diagnostics: Vec::new(),
        }
    }

    // Never touches the tokenizer again once it has reported the end.
    fn pull(&mut self) -> Option<Token> {
        while !self.exhausted {
            match self.tokenizer.next() {
                Some(Ok(token)) => return Some(token),
                Some(Err(diagnostic)) => self.diagnostics.push(diagnostic),
                None => self.exhausted = true,
            }
        }
        None
    }

    /// Consume the next token.
    pub fn next(&mut self) -> Result<Token, EndOfStream> {
        if let Ok(token) = self.buffer.pop() {
            return Ok(token);
        }
        self.pull().ok_or(EndOfStream)
    }

    /// Peek `n` tokens ahead without consuming; `0` is what `next` would return.
    pub fn lookahead(&mut self, n: usize) -> Result<&Token, EndOfStream> {
        while self.buffer.len() <= n {
            match self.pull() {
                Some(token) => self.buffer.push(token),
                None => return Err(EndOfStream),
            }
        }
        self.buffer.at(n).ok_or(EndOfStream)
    }

    pub fn is_at_end(&mut self) -> bool {
        self.lookahead(0).is_err()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
