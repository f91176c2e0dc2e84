//! Source and element locations for EDM diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location with line and column information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, in characters)
    pub column: usize,
    /// Byte offset from start (0-based)
    pub offset: usize,
}

impl SourceLocation {
    /// Create a new source location
    pub const fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// Create from a byte offset and source text
    pub fn from_offset(offset: usize, source: &str) -> Self {
        let (line, column) = offset_to_line_col(source, offset);
        Self::new(line, column, offset)
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Convert a byte offset to line and column numbers
pub fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Precomputed line starts for repeated offset lookups over one document
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    /// Index the line starts of `source`
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            source,
            line_starts,
        }
    }

    /// Resolve a byte offset to a location
    pub fn location(&self, offset: usize) -> SourceLocation {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self
            .source
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start)
            + 1;
        SourceLocation::new(line + 1, column, offset)
    }
}

/// Where a diagnostic applies
///
/// Elements parsed from text carry their line and column; elements built in
/// code are identified by a stable textual path such as `NS.Customer/Id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdmLocation {
    /// Position in a parsed document
    Text(SourceLocation),
    /// Identifier of an in-memory element
    Element(String),
}

impl EdmLocation {
    /// Create an element location
    pub fn element(path: impl Into<String>) -> Self {
        Self::Element(path.into())
    }

    /// The text position, if this location came from a document
    pub fn source_location(&self) -> Option<SourceLocation> {
        match self {
            Self::Text(loc) => Some(*loc),
            Self::Element(_) => None,
        }
    }
}

impl From<SourceLocation> for EdmLocation {
    fn from(location: SourceLocation) -> Self {
        Self::Text(location)
    }
}

impl fmt::Display for EdmLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(loc) => write!(f, "({}, {})", loc.line, loc.column),
            Self::Element(path) => write!(f, "{}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_line_col() {
        let source = "line1\nline2\nline3";
        assert_eq!(offset_to_line_col(source, 0), (1, 1));
        assert_eq!(offset_to_line_col(source, 5), (1, 6));
        assert_eq!(offset_to_line_col(source, 6), (2, 1));
        assert_eq!(offset_to_line_col(source, 12), (3, 1));
    }

    #[test]
    fn test_line_index_matches_linear_scan() {
        let source = "<a>\n  <b/>\n\u{e9}<c/>\n";
        let index = LineIndex::new(source);
        for offset in [0, 3, 4, 6, 11, 13] {
            let (line, column) = offset_to_line_col(source, offset);
            let loc = index.location(offset);
            assert_eq!((loc.line, loc.column), (line, column), "offset {}", offset);
        }
    }

    #[test]
    fn test_location_display() {
        assert_eq!(EdmLocation::from(SourceLocation::new(3, 7, 40)).to_string(), "(3, 7)");
        assert_eq!(EdmLocation::element("NS.T/P").to_string(), "NS.T/P");
    }
}
