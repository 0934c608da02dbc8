//! Diagnostics: convert syntax errors and validation issues to LSP diagnostics

use comlink_parser::{SyntaxError, ValidationIssue, ValidationResult};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Range};

use crate::convert::{location_to_range, span_to_range};

/// Convert a syntax error to the single diagnostic a failed document shows.
#[must_use]
pub fn syntax_error_to_diagnostic(error: &SyntaxError, source: &str) -> Diagnostic {
    Diagnostic {
        range: span_to_range(source, error.span, error.location),
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(error.category.to_string()),
        message: error.message(),
        ..Default::default()
    }
}

/// One diagnostic per validation error and warning, errors first.
#[must_use]
pub fn validation_diagnostics(result: &ValidationResult) -> Vec<Diagnostic> {
    let errors = result
        .errors
        .iter()
        .map(|issue| issue_to_diagnostic(issue, DiagnosticSeverity::ERROR));
    let warnings = result
        .warnings
        .iter()
        .map(|issue| issue_to_diagnostic(issue, DiagnosticSeverity::WARNING));
    errors.chain(warnings).collect()
}

/// Issues without a location are reported at the start of the document.
fn issue_to_diagnostic(issue: &ValidationIssue, severity: DiagnosticSeverity) -> Diagnostic {
    Diagnostic {
        range: issue
            .location
            .as_ref()
            .map_or_else(Range::default, location_to_range),
        severity: Some(severity),
        source: Some("comlink".to_string()),
        message: issue.to_string(),
        ..Default::default()
    }
}

/// Keep at most `max_problems` diagnostics.
#[must_use]
pub fn truncate(diagnostics: &[Diagnostic], max_problems: Option<usize>) -> Vec<Diagnostic> {
    let limit = max_problems.unwrap_or(diagnostics.len());
    diagnostics.iter().take(limit).cloned().collect()
}
