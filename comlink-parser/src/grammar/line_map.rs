use crate::{Location, Position};

/// Sorted line start offsets of one input, for O(log n) offset to position
/// lookups from inside PEG actions.
#[derive(Debug, Clone)]
pub(crate) struct LineMap {
    line_starts: Vec<usize>,
}

impl LineMap {
    pub(crate) fn new(input: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, ch) in input.char_indices() {
            if ch == '\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a 1-based `Position`. Offsets inside a
    /// multi-byte character round back to that character's start; offsets past
    /// the end clamp to the end.
    pub(crate) fn offset_to_position(&self, offset: usize, input: &str) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line_idx) => line_idx + 1,
            Err(line_idx) => line_idx,
        };

        let line_start = self
            .line_starts
            .get(line.saturating_sub(1))
            .copied()
            .unwrap_or(0);

        let adjusted_offset = if offset > input.len() {
            input.len()
        } else {
            (0..=offset)
                .rev()
                .find(|&i| input.is_char_boundary(i))
                .unwrap_or(0)
        };

        let chars_in_line = input
            .get(line_start..adjusted_offset)
            .map_or(0, |s| s.chars().count());

        Position {
            line,
            column: chars_in_line + 1,
        }
    }

    pub(crate) fn location(&self, start: usize, end: usize, input: &str) -> Location {
        Location {
            absolute_start: start,
            absolute_end: end,
            start: self.offset_to_position(start, input),
            end: self.offset_to_position(end, input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_map_multiple_lines() {
        let input = "Line 1\nLine 2\nLine 3";
        let line_map = LineMap::new(input);

        assert_eq!(line_map.line_starts, vec![0, 7, 14]);
        assert_eq!(
            line_map.offset_to_position(0, input),
            Position { line: 1, column: 1 }
        );
        assert_eq!(
            line_map.offset_to_position(7, input),
            Position { line: 2, column: 1 }
        );
        assert_eq!(
            line_map.offset_to_position(20, input),
            Position { line: 3, column: 7 }
        );
    }

    #[test]
    fn test_line_map_counts_characters_not_bytes() {
        let input = "héllo\nwörld";
        let line_map = LineMap::new(input);

        // 'ö' is two bytes; the offset after it is column 3
        assert_eq!(
            line_map.offset_to_position(10, input),
            Position { line: 2, column: 3 }
        );
        // offset 9 is inside 'ö' and rounds back to its start
        assert_eq!(
            line_map.offset_to_position(9, input),
            Position { line: 2, column: 2 }
        );
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let input = "abc";
        let line_map = LineMap::new(input);
        assert_eq!(
            line_map.offset_to_position(99, input),
            Position { line: 1, column: 4 }
        );
    }
}
