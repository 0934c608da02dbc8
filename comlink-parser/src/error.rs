use std::fmt;

use serde::Serialize;

use crate::model::Position;

/// A byte range `start..end` in the parsed source.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Which stage of parsing rejected the document.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Lexer,
    Parser,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexer => f.write_str("lexer"),
            Self::Parser => f.write_str("parser"),
        }
    }
}

/// The single error produced when a document fails to parse.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{category} error at {location}: {detail}")]
pub struct SyntaxError {
    /// Offending region of the source.
    pub span: Span,
    /// 1-based position of `span.start`.
    pub location: Position,
    pub detail: String,
    pub hint: Option<String>,
    pub category: ErrorCategory,
}

impl SyntaxError {
    /// The detail followed by the hint, if there is one.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.hint {
            Some(hint) => format!("{}\n{hint}", self.detail),
            None => self.detail.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(hint: Option<&str>) -> SyntaxError {
        SyntaxError {
            span: Span { start: 4, end: 5 },
            location: Position { line: 1, column: 5 },
            detail: "expected \"=\"".to_string(),
            hint: hint.map(ToString::to_string),
            category: ErrorCategory::Parser,
        }
    }

    #[test]
    fn test_syntax_error_display() {
        assert_eq!(
            format!("{}", error(None)),
            "parser error at line: 1, column: 5: expected \"=\""
        );
    }

    #[test]
    fn test_message_appends_hint() {
        assert_eq!(error(None).message(), "expected \"=\"");
        assert_eq!(
            error(Some("try this")).message(),
            "expected \"=\"\ntry this"
        );
    }
}
