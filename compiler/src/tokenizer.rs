use std::fmt;

use tracing::trace;

use crate::error::Diagnostic;
use crate::source::{CharStream, SourceChars, Span};
use crate::utils::quote;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Question,
    Comma,
}

impl TokenKind {
    /// Single-character punctuation, or `None` for anything else.
    pub fn from_char(ch: char) -> Option<TokenKind> {
        Some(match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '?' => TokenKind::Question,
            ',' => TokenKind::Comma,
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenKind::Identifier   => "identifier",
            TokenKind::LeftBrace    => "\"{\"",
            TokenKind::RightBrace   => "\"}\"",
            TokenKind::LeftParen    => "\"(\"",
            TokenKind::RightParen   => "\")\"",
            TokenKind::LeftBracket  => "\"[\"",
            TokenKind::RightBracket => "\"]\"",
            TokenKind::Question     => "\"?\"",
            TokenKind::Comma        => "\",\"",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub span: Span,
    pub kind: TokenKind,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == word
    }

    /// How the token is quoted in diagnostics.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Identifier => format!("identifier {}", quote(&self.text)),
            kind => kind.to_string(),
        }
    }
}

pub fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

pub fn is_identifier_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Lazily turns a [`CharStream`] into tokens.
///
/// Yields `Err` for a character that cannot start any token; the character is
/// consumed so the next call carries on after it. Returns `None` once the
/// input is exhausted, and keeps returning `None` after that.
pub struct Tokenizer<S> {
    source: S,
}

impl<'a> Tokenizer<SourceChars<'a>> {
    pub fn from_text(text: &'a str) -> Self {
        Tokenizer::new(SourceChars::new(text))
    }
}

impl<S: CharStream> Tokenizer<S> {
    pub fn new(source: S) -> Self {
        Tokenizer { source }
    }

    fn bump(&mut self) -> bool {
        self.source.advance().is_ok()
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.source.current() {
            if ch.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.source.current() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn identifier(&mut self) -> Token {
        let start = self.source.position();
        let mut text = String::new();
        while let Some(ch) = self.source.current() {
            if !is_identifier_continue(ch) {
                break;
            }
            text.push(ch);
            if !self.bump() {
                break;
            }
        }
        Token {
            text,
            span: Span::new(start, self.source.position()),
            kind: TokenKind::Identifier,
        }
    }

    fn next_token(&mut self) -> Option<Result<Token, Diagnostic>> {
        loop {
            self.skip_trivia();
            let ch = self.source.current()?;
            let start = self.source.position();

            if is_identifier_start(ch) {
                return Some(Ok(self.identifier()));
            }

            if let Some(kind) = TokenKind::from_char(ch) {
                self.bump();
                return Some(Ok(Token {
                    text: ch.to_string(),
                    span: Span::new(start, self.source.position()),
                    kind,
                }));
            }

            self.bump();
            if ch == '/' && self.source.current() == Some('/') {
                self.skip_line();
                continue;
            }

            let span = Span::new(start, self.source.position());
            return Some(Err(Diagnostic::lexical(
                format!("unrecognized character {}", quote(&ch.to_string())),
                span,
            )));
        }
    }
}

impl<S: CharStream> Iterator for Tokenizer<S> {
    type Item = Result<Token, Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.next_token();
        if let Some(Ok(token)) = &item {
            trace!(text = %token.text, at = %token.span.start, "token");
        }
        item
    }
}

/// Tokenize a whole string, stopping at the first unrecognized character.
pub fn tokenize(text: &str) -> Result<Vec<Token>, Diagnostic> {
    Tokenizer::from_text(text).collect()
}
