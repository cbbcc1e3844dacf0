use std::fmt;

use thiserror::Error;

use crate::source::Span;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{count} error(s) in service definition:\n{0}", count = .0.len())]
    Diagnostics(DiagnosticReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    DuplicateSymbol,
    UndefinedSymbol,
    ShapeRule,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::Lexical         => "lexical error",
            DiagnosticKind::Syntax          => "syntax error",
            DiagnosticKind::DuplicateSymbol => "duplicate symbol",
            DiagnosticKind::UndefinedSymbol => "undefined symbol",
            DiagnosticKind::ShapeRule       => "invalid signature",
        })
    }
}

/// A single compile-time problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind:    DiagnosticKind,
    pub message: String,
    pub span:    Option<Span>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, span: Option<Span>) -> Diagnostic {
        Diagnostic { kind, message: message.into(), span }
    }

    pub fn lexical(message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Lexical, message, Some(span))
    }

    pub fn syntax(message: impl Into<String>, span: Option<Span>) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Syntax, message, span)
    }

    pub fn duplicate(message: impl Into<String>, span: Option<Span>) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::DuplicateSymbol, message, span)
    }

    pub fn undefined(message: impl Into<String>, span: Option<Span>) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::UndefinedSymbol, message, span)
    }

    pub fn shape(message: impl Into<String>, span: Option<Span>) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::ShapeRule, message, span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{}: {}: {}", span.start, self.kind, self.message),
            None       => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Every diagnostic from one compile, in source order where spans allow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport(Vec<Diagnostic>);

impl DiagnosticReport {
    pub fn new(diagnostics: Vec<Diagnostic>) -> DiagnosticReport {
        DiagnosticReport(diagnostics)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.0.iter().any(|d| d.kind == kind)
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl std::error::Error for DiagnosticReport {}

impl<'a> IntoIterator for &'a DiagnosticReport {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Position;

    #[test]
    fn report_joins_lines() {
        let span = Span::new(Position::new(4, 1, 2), Position::new(7, 1, 5));
        let report = DiagnosticReport::new(vec![
            Diagnostic::undefined("unknown type \"Foo\" in \"M.a\"", Some(span)),
            Diagnostic::duplicate("procedure \"Do\" is defined twice", None),
        ]);
        assert_eq!(
            report.to_string(),
            "2:3: undefined symbol: unknown type \"Foo\" in \"M.a\"\nduplicate symbol: procedure \"Do\" is defined twice"
        );
        assert!(report.has_kind(DiagnosticKind::DuplicateSymbol));
        assert!(!report.has_kind(DiagnosticKind::Lexical));
    }

    #[test]
    fn compile_error_messages() {
        let report = DiagnosticReport::new(vec![Diagnostic::syntax("expected \"{\"", None)]);
        assert_eq!(
            CompileError::Diagnostics(report).to_string(),
            "1 error(s) in service definition:\nsyntax error: expected \"{\""
        );

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "service.rpc");
        assert_eq!(CompileError::from(io).to_string(), "I/O error: service.rpc");
    }
}
