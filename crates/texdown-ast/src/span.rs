//! Source positions.
//!
//! Every node and token carries a [`Span`] of absolute byte offsets into the
//! source text of its file. Line and column numbers are only computed on
//! demand, by re-scanning the source, when a position has to be shown to a
//! user.

use serde::Serialize;
use std::fmt;

/// A half-open byte range `start..end` in the source of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {} after end {}", start, end);
        Self { start, end }
    }

    /// An empty span located at `offset`.
    pub fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Resolve both ends of the span to line/column form.
    pub fn resolve(&self, source: &str) -> (LineColumn, LineColumn) {
        (
            LineColumn::locate(source, self.start),
            LineColumn::locate(source, self.end),
        )
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A 1-based line and column. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl LineColumn {
    /// Locate `offset` in `source`. Offsets past the end clamp to the end.
    pub fn locate(source: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut column = 1;
        for (idx, ch) in source.char_indices() {
            if idx >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        LineColumn { line, column }
    }
}

impl fmt::Display for LineColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_covers_both() {
        let joined = Span::new(4, 6).join(Span::new(1, 5));
        assert_eq!(joined, Span::new(1, 6));
        assert!(joined.contains(&Span::new(4, 6)));
    }

    #[test]
    fn test_locate_lines_and_columns() {
        let source = "ab\ncd\n\nxé";
        assert_eq!(LineColumn::locate(source, 0), LineColumn { line: 1, column: 1 });
        assert_eq!(LineColumn::locate(source, 4), LineColumn { line: 2, column: 2 });
        assert_eq!(LineColumn::locate(source, 7), LineColumn { line: 4, column: 1 });
        // 'é' is two bytes wide but one column
        assert_eq!(LineColumn::locate(source, 10), LineColumn { line: 4, column: 3 });
    }

    #[test]
    fn test_locate_clamps() {
        let pos = LineColumn::locate("abc", 99);
        assert_eq!(pos.to_string(), "1:4");
    }
}
