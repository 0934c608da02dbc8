//! Parser and validator for Comlink profile (`.supr`) and map (`.suma`)
//! documents.
//!
//! ```
//! use comlink_parser::{SyntaxKind, SyntaxTree, parse};
//!
//! let input = "name = \"weather\"\nversion = \"1.0.0\"\nusecase GetWeather {}\n";
//! let tree = parse(input, SyntaxKind::Profile)?;
//! assert!(matches!(tree, SyntaxTree::Profile(_)));
//! # Ok::<(), comlink_parser::SyntaxError>(())
//! ```

mod error;
mod grammar;
mod lexer;
mod model;
mod validate;

use grammar::{LineMap, document_parser};

pub use error::{ErrorCategory, Span, SyntaxError};
pub use model::{
    CallSite, DocumentName, Location, MapBody, MapDefinition, MapDocument, MapHeader,
    NamedFieldDefinition, NamedModelDefinition, Position, ProfileDefinition, ProfileDocument,
    ProfileHeader, ProfileId, SyntaxTree, UseCaseDefinition, UseCaseSafety, Version,
};
pub use validate::{
    IssueKind, ProfileOutput, UseCaseOutput, ValidationIssue, ValidationResult,
    compute_profile_output, validate_map,
};

/// The grammar a document is parsed with.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum SyntaxKind {
    Profile,
    Map,
}

/// Parse `input` as a document of the given kind.
///
/// # Errors
///
/// Returns the first lexical or syntactic problem found. Parsing never
/// recovers; a document has either a tree or exactly one error.
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn parse(input: &str, kind: SyntaxKind) -> Result<SyntaxTree, SyntaxError> {
    let lines = LineMap::new(input);
    lexer::check_strings(input, &lines)?;

    let result = match kind {
        SyntaxKind::Profile => document_parser::profile(input, &lines, input).map(SyntaxTree::Profile),
        SyntaxKind::Map => document_parser::map(input, &lines, input).map(SyntaxTree::Map),
    };

    result.map_err(|error| {
        let error = from_peg_error(input, &lines, kind, &error);
        tracing::debug!(%error, "document failed to parse");
        error
    })
}

fn from_peg_error(
    input: &str,
    lines: &LineMap,
    kind: SyntaxKind,
    error: &peg::error::ParseError<peg::str::LineCol>,
) -> SyntaxError {
    let start = error.location.offset;
    let offending = input.get(start..).and_then(|rest| rest.chars().next());
    let end = start + offending.map_or(0, char::len_utf8);

    let detail = match offending {
        Some(ch) => format!("unexpected {ch:?}, expected {}", error.expected),
        None => format!("unexpected end of input, expected {}", error.expected),
    };

    SyntaxError {
        span: Span { start, end },
        location: lines.offset_to_position(start, input),
        detail,
        hint: header_hint(kind, error),
        category: ErrorCategory::Parser,
    }
}

fn header_hint(
    kind: SyntaxKind,
    error: &peg::error::ParseError<peg::str::LineCol>,
) -> Option<String> {
    let expects = |token: &str| {
        error
            .expected
            .tokens()
            .any(|expected| expected.trim_matches('"') == token)
    };
    match kind {
        SyntaxKind::Profile if expects("name") || expects("version") => Some(
            "profiles start with `name = \"[scope/]name\"` followed by `version = \"<major>.<minor>.<patch>\"`"
                .to_string(),
        ),
        SyntaxKind::Map if expects("profile") || expects("provider") => Some(
            "maps start with `profile = \"[scope/]name@<major>.<minor>\"` followed by `provider = \"<name>\"`"
                .to_string(),
        ),
        SyntaxKind::Profile | SyntaxKind::Map => None,
    }
}
