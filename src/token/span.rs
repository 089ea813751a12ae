//! Source location tracking for the Tern compiler.

use crate::source::{AnchorId, FileId};

/// A span representing a range in one source file.
///
/// `Span` tracks byte offsets (for slicing the file text and for
/// byte-indexed diagnostics) plus the human-readable position of the span
/// start. The optional `anchor` links a span in an imported file back to
/// the `#IMPORT` directive that pulled the file in; anchors chain, so a
/// span carries its whole import history.
///
/// # Fields
///
/// * `file` - The file this span points into
/// * `start` - The starting byte offset (inclusive)
/// * `end` - The ending byte offset (exclusive)
/// * `line` - The 1-indexed line number where this span begins
/// * `column` - The 1-indexed column number where this span begins
/// * `anchor` - The import site of the file, if it was imported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// The file this span points into.
    pub file: FileId,
    /// The starting byte offset (inclusive).
    pub start: usize,
    /// The ending byte offset (exclusive).
    pub end: usize,
    /// The 1-indexed line number where this span begins.
    pub line: usize,
    /// The 1-indexed column number where this span begins.
    pub column: usize,
    /// The import site of the owning file, if it was imported.
    pub anchor: Option<AnchorId>,
}

impl Span {
    /// Creates a new `Span` with no import anchor.
    pub fn new(file: FileId, start: usize, end: usize, line: usize, column: usize) -> Self {
        Span {
            file,
            start,
            end,
            line,
            column,
            anchor: None,
        }
    }

    /// Returns this span with its import anchor set.
    pub fn with_anchor(mut self, anchor: AnchorId) -> Self {
        self.anchor = Some(anchor);
        self
    }
}
