//! Conversions between comlink-parser positions and LSP types, and text edits.

use comlink_parser::{Location, Span};
use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent};

/// Convert usize to u32 for LSP types, saturating at `u32::MAX`.
fn to_lsp_u32(val: usize) -> u32 {
    val.try_into().unwrap_or(u32::MAX)
}

/// Convert an LSP position to a byte offset in `source`.
///
/// Columns count characters. A line past the end maps to the end of the
/// document and a column past the end of its line maps to the end of that
/// line, so edits sent against slightly stale positions still apply.
#[must_use]
pub fn position_to_offset(source: &str, position: Position) -> usize {
    let mut line_start = 0;
    for _ in 0..position.line {
        match source.get(line_start..).and_then(|rest| rest.find('\n')) {
            Some(newline) => line_start += newline + 1,
            None => return source.len(),
        }
    }

    let line = source
        .get(line_start..)
        .and_then(|rest| rest.split('\n').next())
        .unwrap_or_default();
    let line = line.strip_suffix('\r').unwrap_or(line);

    let char_offset: usize = line
        .chars()
        .take(position.character as usize)
        .map(char::len_utf8)
        .sum();
    line_start + char_offset
}

/// Apply editor content changes in order. A change without a range replaces
/// the whole text.
#[must_use]
pub fn apply_content_changes(text: &str, changes: &[TextDocumentContentChangeEvent]) -> String {
    let mut text = text.to_string();
    for change in changes {
        match change.range {
            Some(range) => {
                let start = position_to_offset(&text, range.start);
                let end = position_to_offset(&text, range.end).max(start);
                text.replace_range(start..end, &change.text);
            }
            None => text.clone_from(&change.text),
        }
    }
    text
}

/// Compute the 1-based end position of `span` given the 1-based position of
/// its start, by scanning the spanned text for line breaks.
#[must_use]
pub fn end_position(
    source: &str,
    span: Span,
    start: comlink_parser::Position,
) -> comlink_parser::Position {
    let spanned = source.get(span.start..span.end).unwrap_or_default();
    match spanned.rfind('\n') {
        Some(last_break) => comlink_parser::Position {
            line: start.line + spanned.matches('\n').count(),
            column: spanned
                .get(last_break + 1..)
                .map_or(0, |tail| tail.chars().count())
                + 1,
        },
        None => comlink_parser::Position {
            line: start.line,
            column: start.column + spanned.chars().count(),
        },
    }
}

/// Range of a reported error span. Both ends are converted to 0-based.
#[must_use]
pub fn span_to_range(source: &str, span: Span, start: comlink_parser::Position) -> Range {
    Range {
        start: parser_position_to_lsp(start),
        end: parser_position_to_lsp(end_position(source, span, start)),
    }
}

/// Convert comlink-parser Location to LSP Range
///
/// Note: comlink-parser uses 1-indexed lines/columns, LSP uses 0-indexed
#[must_use]
pub fn location_to_range(loc: &Location) -> Range {
    Range {
        start: parser_position_to_lsp(loc.start),
        end: parser_position_to_lsp(loc.end),
    }
}

/// Convert a parser Position to an LSP Position
#[must_use]
pub fn parser_position_to_lsp(pos: comlink_parser::Position) -> Position {
    Position {
        line: to_lsp_u32(pos.line.saturating_sub(1)),
        character: to_lsp_u32(pos.column.saturating_sub(1)),
    }
}
