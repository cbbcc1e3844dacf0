use std::fs;
use std::path::Path;

use brine_rpc_schema::Service;
use tracing::{debug, warn};

use crate::{
    analyzer::analyze,
    error::{CompileError, DiagnosticReport},
    parser::parse_service,
};

/// Compile interface-definition text into a resolved [`Service`].
///
/// Lexical and syntax problems stop the compile before analysis, since a
/// partially parsed file would produce misleading undefined-symbol reports.
/// Otherwise every diagnostic from every analysis pass is returned together.
pub fn compile(text: &str) -> Result<Service, CompileError> {
    let (definition, diagnostics) = parse_service(text);
    if !diagnostics.is_empty() {
        warn!(count = diagnostics.len(), "service definition failed to parse");
        return Err(CompileError::Diagnostics(DiagnosticReport::new(diagnostics)));
    }

    match analyze(&definition) {
        Ok(service) => {
            debug!(
                types = service.type_count(),
                procedures = service.procedures().len(),
                "compiled service"
            );
            Ok(service)
        }
        Err(diagnostics) => {
            warn!(count = diagnostics.len(), "service definition failed analysis");
            Err(CompileError::Diagnostics(DiagnosticReport::new(diagnostics)))
        }
    }
}

pub fn compile_file(path: impl AsRef<Path>) -> Result<Service, CompileError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading service definition");
    let text = fs::read_to_string(path)?;
    compile(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    #[test]
    fn empty_source_compiles() {
        let service = compile("").unwrap();
        assert_eq!(service.user_types().count(), 0);
        assert!(service.procedures().is_empty());
    }

    #[test]
    fn syntax_errors_skip_analysis() {
        let err = compile("model M { a Unknown, }").unwrap_err();
        match err {
            CompileError::Diagnostics(report) => {
                assert_eq!(report.len(), 1);
                assert!(report.has_kind(DiagnosticKind::Syntax));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn report_lists_every_problem() {
        let err = compile("model M { a X b Y }").unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("2 error(s) in service definition:\n"));
        assert!(text.contains("\"X\""));
        assert!(text.contains("\"Y\""));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = compile_file("/definitely/not/here.rpc").unwrap_err();
        assert!(matches!(err, CompileError::Io(_)));
    }
}
