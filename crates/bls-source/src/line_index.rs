use tower_lsp_server::ls_types::Position;

/// Precomputed line-start offsets for offset↔position conversion.
///
/// All scanning in this workspace operates on byte offsets; positions are
/// only materialized at the LSP boundary, so this index is rebuilt whenever
/// a document's content is replaced.
#[derive(Clone, Debug)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    length: u32,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut pos = 0u32;

        for c in text.chars() {
            pos += u32::try_from(c.len_utf8()).unwrap_or(0);
            if c == '\n' {
                line_starts.push(pos);
            }
        }

        Self {
            line_starts,
            length: pos,
        }
    }

    /// Byte offset of an LSP position, or `None` if the line is out of range.
    #[must_use]
    pub fn offset(&self, position: Position) -> Option<u32> {
        let line_start = self.line_starts.get(position.line as usize)?;
        Some(line_start + position.character)
    }

    #[must_use]
    pub fn position(&self, offset: u32) -> Position {
        let offset = offset.min(self.length);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line - 1,
        };

        let character = offset - self.line_starts[line];
        Position::new(u32::try_from(line).unwrap_or(u32::MAX), character)
    }

    /// Start offset of the given zero-based line, clamped to text length.
    #[must_use]
    pub fn line_start(&self, line: u32) -> u32 {
        self.line_starts
            .get(line as usize)
            .copied()
            .unwrap_or(self.length)
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_one_line() {
        let index = LineIndex::new("");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.position(0), Position::new(0, 0));
    }

    #[test]
    fn test_offset_round_trip() {
        let index = LineIndex::new("hello\nworld\n");
        let pos = Position::new(1, 3);
        let offset = index.offset(pos).unwrap();
        assert_eq!(offset, 9);
        assert_eq!(index.position(offset), pos);
    }

    #[test]
    fn test_position_clamps_past_end() {
        let index = LineIndex::new("ab");
        assert_eq!(index.position(100), Position::new(0, 2));
    }

    #[test]
    fn test_offset_rejects_unknown_line() {
        let index = LineIndex::new("one\ntwo");
        assert!(index.offset(Position::new(5, 0)).is_none());
    }
}
