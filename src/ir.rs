//! Source-location IR
//!
//! Positions and spans carried by slot manifests and transform errors.
//! Produced from Tree-Sitter nodes and used for developer diagnostics.

use std::fmt;

/// Position in source code (line and column, 0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number (0-indexed)
    pub row: usize,
    /// Column number (0-indexed, in bytes)
    pub column: usize,
}

impl Position {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Create a zero position (used as default)
    pub fn zero() -> Self {
        Self { row: 0, column: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

/// Span of source code with absolute byte offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start position (inclusive)
    pub start: Position,
    /// End position (exclusive)
    pub end: Position,
    /// Start byte offset (absolute position in source)
    pub start_byte: usize,
    /// End byte offset (absolute position in source)
    pub end_byte: usize,
}

impl Span {
    pub fn new(start: Position, end: Position, start_byte: usize, end_byte: usize) -> Self {
        Self {
            start,
            end,
            start_byte,
            end_byte,
        }
    }

    /// Create a zero span (used as default)
    pub fn zero() -> Self {
        Self {
            start: Position::zero(),
            end: Position::zero(),
            start_byte: 0,
            end_byte: 0,
        }
    }

    /// Extract a span from a Tree-Sitter node
    pub fn from_node(node: &tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self::new(
            Position::new(start.row, start.column),
            Position::new(end.row, end.column),
            node.start_byte(),
            node.end_byte(),
        )
    }

    /// Length of the span in bytes
    pub fn len(&self) -> usize {
        self.end_byte.saturating_sub(self.start_byte)
    }

    /// Check if span is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
