use serde::Serialize;

use crate::line_index::LineIndex;

/// A half-open byte region of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub length: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    #[must_use]
    pub fn from_bounds(start: usize, end: usize) -> Self {
        let start = u32::try_from(start).unwrap_or(u32::MAX);
        let end = u32::try_from(end).unwrap_or(u32::MAX);
        Self {
            start,
            length: end.saturating_sub(start),
        }
    }

    #[must_use]
    pub fn end(&self) -> u32 {
        self.start + self.length
    }

    #[must_use]
    pub fn contains(&self, offset: usize) -> bool {
        let offset = u32::try_from(offset).unwrap_or(u32::MAX);
        offset >= self.start && offset < self.end()
    }

    #[must_use]
    pub fn to_lsp_range(&self, index: &LineIndex) -> tower_lsp_server::ls_types::Range {
        let start = index.position(self.start);
        let end = index.position(self.end());
        tower_lsp_server::ls_types::Range { start, end }
    }
}
