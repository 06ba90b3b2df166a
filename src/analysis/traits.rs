//! Core traits for structural parsing.

use std::path::Path;

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// Extractors run their own queries against the tree, so the source is kept
/// alongside it for node text extraction.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedFile {
    /// Get the source code as a string slice.
    pub fn source_str(&self) -> &str {
        std::str::from_utf8(&self.source).unwrap_or("")
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// True when the tree contains no ERROR or MISSING nodes.
    ///
    /// Only clean trees count as a structural success; anything else is
    /// handed to the text fallback.
    pub fn is_clean(&self) -> bool {
        !self.tree.root_node().has_error()
    }
}

/// Language-specific parser front end.
///
/// # Thread Safety
///
/// Note: tree_sitter::Parser is not Sync, so implementations
/// create parsers per call.
pub trait LanguageAnalyzer: Send + Sync {
    /// Returns the language identifier (e.g., "java", "python").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Grammar used for queries against trees produced by `parse`.
    fn grammar(&self, path: &Path) -> tree_sitter::Language;

    /// Parse a source file into a tree-sitter tree.
    ///
    /// Returns an error only if the parser could not run at all. Syntax
    /// errors still produce a tree; check `ParsedFile::is_clean`.
    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&self.grammar(path))?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            anyhow::anyhow!(
                "failed to parse {} source: {}",
                self.language_id(),
                path.display()
            )
        })?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Check if this analyzer handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
