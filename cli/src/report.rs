use brine_rpc_compiler::{Diagnostic, DiagnosticReport};
use codespan_reporting::diagnostic::{Diagnostic as Report, Label};
use codespan_reporting::files::{Error as FilesError, SimpleFile};
use codespan_reporting::term::{self, termcolor::WriteColor};

fn to_report(diagnostic: &Diagnostic) -> Report<()> {
    let report = Report::error().with_message(format!("{}: {}", diagnostic.kind, diagnostic.message));
    match diagnostic.span {
        Some(span) => report.with_labels(vec![Label::primary((), span.byte_range())]),
        None => report,
    }
}

/// Render every diagnostic against the source it came from.
pub fn emit_diagnostics(
    writer: &mut dyn WriteColor,
    name: &str,
    source: &str,
    diagnostics: &DiagnosticReport,
) -> Result<(), FilesError> {
    let file = SimpleFile::new(name, source);
    let config = term::Config::default();
    for diagnostic in diagnostics {
        term::emit(writer, &config, &file, &to_report(diagnostic))?;
    }
    writer.flush()?;
    Ok(())
}
