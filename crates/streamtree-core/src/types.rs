//! Core types for streamtree

use serde::{Deserialize, Serialize};

/// A half-open range of source lines `[start, end)`, 0-indexed.
///
/// Block tokens carry one of these so node builders can slice the
/// verbatim source for a node's `raw` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineSpan {
    /// First line (inclusive)
    pub start: usize,
    /// Last line (exclusive)
    pub end: usize,
}

impl LineSpan {
    /// Create a new span from start and end lines
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Shift the span down by `lines`.
    pub fn offset(self, lines: usize) -> Self {
        Self::new(self.start + lines, self.end + lines)
    }

    /// Number of lines covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers no lines.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both.
    pub fn union(self, other: LineSpan) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}
