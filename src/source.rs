//! Source file tracking for the Tern compiler.
//!
//! This module provides the [`SourceSet`] arena which owns every file the
//! lexer touches (the entry file plus everything pulled in by `#IMPORT`),
//! along with the import [`Anchor`] records that let diagnostics walk back
//! from a token in an included file to the chain of `#IMPORT` lines that
//! brought it in.

use crate::token::Span;

/// Maximum number of nested `#IMPORT` levels.
///
/// Exceeding this is a fatal lexer error; the bound exists so that an
/// import cycle terminates with a diagnostic instead of unbounded
/// recursion.
pub const MAX_IMPORT_DEPTH: usize = 100;

/// Identifies a file inside a [`SourceSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(u32);

/// Identifies an import anchor inside a [`SourceSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorId(u32);

/// A single source file: its name and full text.
#[derive(Debug)]
pub struct SourceFile {
    name: String,
    text: String,
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
}

impl SourceFile {
    fn new(name: String, text: String) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        SourceFile {
            name,
            text,
            line_starts,
        }
    }

    /// Returns the name the file was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full text of the file.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the byte offset at which the 1-indexed `line` starts.
    ///
    /// Out-of-range lines clamp to the end of the text.
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts
            .get(line.saturating_sub(1))
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Returns the 1-indexed `line`'s text without its trailing newline.
    pub fn line_text(&self, line: usize) -> &str {
        let start = self.line_start(line);
        let rest = &self.text[start..];
        rest.split('\n').next().unwrap_or(rest)
    }
}

/// An import site: the location of one `#IMPORT` directive.
///
/// Anchors chain through `parent`; the chain ends at the entry file.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    /// The span of the `#IMPORT` directive in the importing file.
    pub site: Span,
}

impl Anchor {
    /// Returns the anchor the importing file was itself imported from.
    pub fn parent(&self) -> Option<AnchorId> {
        self.site.anchor
    }
}

/// Arena of all lexed files and import anchors.
///
/// The set is created once per compilation by the driver and threaded
/// through the lexer, which registers every file it opens. Diagnostics
/// borrow it to render snippets from any file an error points into.
#[derive(Debug, Default)]
pub struct SourceSet {
    files: Vec<SourceFile>,
    anchors: Vec<Anchor>,
}

impl SourceSet {
    /// Creates an empty source set.
    pub fn new() -> Self {
        SourceSet::default()
    }

    /// Registers a file and returns its id.
    pub fn add_file(&mut self, name: impl Into<String>, text: impl Into<String>) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile::new(name.into(), text.into()));
        id
    }

    /// Returns the file for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this set.
    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    /// Iterates over all registered files.
    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    /// Registers an import anchor. `site` is the span of the `#IMPORT`
    /// directive; its own `anchor` field is the parent link.
    pub fn add_anchor(&mut self, site: Span) -> AnchorId {
        let id = AnchorId(self.anchors.len() as u32);
        self.anchors.push(Anchor { site });
        id
    }

    /// Returns the anchor for `id`.
    pub fn anchor(&self, id: AnchorId) -> &Anchor {
        &self.anchors[id.0 as usize]
    }

    /// Returns the number of anchors between `id` and the entry file,
    /// inclusive of `id` itself.
    pub fn anchor_depth(&self, id: AnchorId) -> usize {
        let mut depth = 1;
        let mut current = self.anchor(id).parent();
        while let Some(parent) = current {
            depth += 1;
            current = self.anchor(parent).parent();
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_starts() {
        let mut sources = SourceSet::new();
        let id = sources.add_file("a.tn", "ab\ncd\n");
        let file = sources.file(id);
        assert_eq!(file.line_start(1), 0);
        assert_eq!(file.line_start(2), 3);
        assert_eq!(file.line_text(1), "ab");
        assert_eq!(file.line_text(2), "cd");
    }

    #[test]
    fn test_line_text_without_trailing_newline() {
        let mut sources = SourceSet::new();
        let id = sources.add_file("a.tn", "one\ntwo");
        assert_eq!(sources.file(id).line_text(2), "two");
    }

    #[test]
    fn test_anchor_depth_chain() {
        let mut sources = SourceSet::new();
        let file = sources.add_file("a.tn", "#IMPORT \"b\"\n");
        let root = sources.add_anchor(Span::new(file, 0, 11, 1, 1));
        let child_site = Span::new(file, 0, 11, 1, 1).with_anchor(root);
        let child = sources.add_anchor(child_site);
        assert_eq!(sources.anchor_depth(root), 1);
        assert_eq!(sources.anchor_depth(child), 2);
    }
}
