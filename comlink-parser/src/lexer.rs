//! Lexical pre-scan.
//!
//! The PEG grammar treats a stray quote as an ordinary character inside
//! bodies, which would turn an unterminated string into a confusing brace
//! error much further down. Strings are checked here first so the error points
//! at the opening quote.

use crate::error::{ErrorCategory, Span, SyntaxError};
use crate::grammar::LineMap;

const TRIPLE_QUOTE: &str = "\"\"\"";

pub(crate) fn check_strings(input: &str, lines: &LineMap) -> Result<(), SyntaxError> {
    let mut rest = input;
    let mut offset = 0;

    while let Some(ch) = rest.chars().next() {
        if rest.starts_with("//") {
            let skip = rest.find('\n').unwrap_or(rest.len());
            offset += skip;
            rest = rest.get(skip..).unwrap_or_default();
        } else if rest.starts_with(TRIPLE_QUOTE) {
            let body = rest.get(TRIPLE_QUOTE.len()..).unwrap_or_default();
            let Some(close) = body.find(TRIPLE_QUOTE) else {
                return Err(unterminated(
                    input,
                    lines,
                    offset,
                    input.len(),
                    "unterminated documentation string",
                    "add a closing `\"\"\"`",
                ));
            };
            let skip = TRIPLE_QUOTE.len() * 2 + close;
            offset += skip;
            rest = rest.get(skip..).unwrap_or_default();
        } else if ch == '"' {
            let skip = scan_string(rest).ok_or_else(|| {
                let line_end = rest.find('\n').map_or(input.len(), |end| offset + end);
                unterminated(
                    input,
                    lines,
                    offset,
                    line_end,
                    "unterminated string literal",
                    "strings cannot span lines; close it with `\"` or use `\"\"\"` for multi-line text",
                )
            })?;
            offset += skip;
            rest = rest.get(skip..).unwrap_or_default();
        } else {
            offset += ch.len_utf8();
            rest = rest.get(ch.len_utf8()..).unwrap_or_default();
        }
    }

    Ok(())
}

/// Byte length of the string literal at the start of `rest`, closing quote
/// included, or `None` if a newline or the end of input comes first.
fn scan_string(rest: &str) -> Option<usize> {
    let mut chars = rest.char_indices().skip(1);
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' => return Some(idx + 1),
            '\\' => {
                if let Some((_, '\n')) | None = chars.next() {
                    return None;
                }
            }
            '\n' => return None,
            _ => {}
        }
    }
    None
}

fn unterminated(
    input: &str,
    lines: &LineMap,
    start: usize,
    end: usize,
    detail: &str,
    hint: &str,
) -> SyntaxError {
    SyntaxError {
        span: Span { start, end },
        location: lines.offset_to_position(start, input),
        detail: detail.to_string(),
        hint: Some(hint.to_string()),
        category: ErrorCategory::Lexer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;
    use pretty_assertions::assert_eq;

    fn check(input: &str) -> Result<(), SyntaxError> {
        check_strings(input, &LineMap::new(input))
    }

    #[test]
    fn test_terminated_strings_pass() {
        assert_eq!(check("name = \"weather\"\n\"\"\"doc\nstring\"\"\"\n"), Ok(()));
        assert_eq!(check("x = \"escaped \\\" quote\""), Ok(()));
    }

    #[test]
    fn test_quotes_in_comments_are_ignored() {
        assert_eq!(check("// don't \"worry\n"), Ok(()));
    }

    #[test]
    fn test_unterminated_string_stops_at_line_end() -> Result<(), String> {
        let input = "name = \"weather\nversion = \"1.0\"";
        let error = check(input).err().ok_or("expected an error")?;
        assert_eq!(error.category, ErrorCategory::Lexer);
        assert_eq!(error.span, Span { start: 7, end: 15 });
        assert_eq!(error.location, Position { line: 1, column: 8 });
        Ok(())
    }

    #[test]
    fn test_unterminated_doc_string_runs_to_end() -> Result<(), String> {
        let input = "\"\"\"title\nusecase Foo {}";
        let error = check(input).err().ok_or("expected an error")?;
        assert_eq!(error.span, Span { start: 0, end: input.len() });
        assert_eq!(error.detail, "unterminated documentation string");
        Ok(())
    }
}
