//! Structural parsing front ends built on tree-sitter.
//!
//! Each analyzer knows its grammar and file extensions; extractors run their
//! own queries against the resulting `ParsedFile`. A tree with ERROR or
//! MISSING nodes is treated as a failed structural parse so that the text
//! fallback gets a chance.
//!
//! # Adding a New Language
//!
//! 1. Create a new module in `src/analysis/languages/`
//! 2. Implement `LanguageAnalyzer`
//! 3. Register the analyzer in `languages/mod.rs`

mod languages;
pub mod query;
mod traits;

pub use languages::{
    analyzer_for_path, get_analyzer, java_analyzer, register_analyzers, JavaAnalyzer, JavaScriptAnalyzer,
    PythonAnalyzer, TypeScriptAnalyzer,
};
pub use languages::java::{annotations, find_annotation, has_modifier, members, Annotation, JavaClass};
pub use traits::{LanguageAnalyzer, ParsedFile};
