/// Position tracking for diagnostics
///
/// Parse trees only store lengths; offsets are byte positions computed while
/// walking. These types translate byte offsets into line/column pairs when an
/// error is shown to a user.
use text_size::{TextRange, TextSize};

/// A span representing a range in source text (0-indexed lines and columns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// A position in source text (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Check if a position falls within this span
    pub fn contains(&self, position: Position) -> bool {
        position >= self.start && position <= self.end
    }
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Maps byte offsets of one text to line/column positions.
///
/// Columns count chars, not bytes.
#[derive(Debug, Clone)]
pub struct LineIndex {
    text: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.char_indices()
                .filter(|(_, c)| *c == '\n')
                .map(|(ix, _)| ix + 1),
        );
        Self {
            text: text.to_string(),
            line_starts,
        }
    }

    /// Number of lines, counting a trailing empty line
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset. Offsets past the end clamp to the end of text.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self
            .text
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        Position::new(line, column)
    }

    pub fn span(&self, range: TextRange) -> Span {
        Span::new(
            self.position(usize::from(range.start())),
            self.position(usize::from(range.end())),
        )
    }
}

/// Build a `TextRange` from two byte offsets.
///
/// Offsets are clamped to `u32::MAX`; `end` is raised to `start` when smaller.
pub fn text_range(start: usize, end: usize) -> TextRange {
    let start = TextSize::from(u32::try_from(start).unwrap_or(u32::MAX));
    let end = TextSize::from(u32::try_from(end).unwrap_or(u32::MAX));
    TextRange::new(start, end.max(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_positions() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.position(0), Position::new(0, 0));
        assert_eq!(index.position(2), Position::new(0, 2));
        assert_eq!(index.position(3), Position::new(1, 0));
        assert_eq!(index.position(7), Position::new(3, 0));
        assert_eq!(index.position(100), Position::new(3, 2));
    }

    #[test]
    fn test_columns_count_chars() {
        let index = LineIndex::new("é=1");
        assert_eq!(index.position(2), Position::new(0, 1));
    }

    #[test]
    fn test_span_contains() {
        let span = Span::new(Position::new(1, 2), Position::new(3, 0));
        assert!(span.contains(Position::new(2, 50)));
        assert!(!span.contains(Position::new(1, 1)));
        assert!(span.contains(Position::new(3, 0)));
    }

    #[test]
    fn test_text_range_orders_end() {
        let range = text_range(5, 3);
        assert_eq!(usize::from(range.start()), 5);
        assert!(range.is_empty());
    }
}
