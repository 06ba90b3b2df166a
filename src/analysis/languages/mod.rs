//! Language-specific parser front ends.

pub mod java;
mod javascript;
mod python;
mod typescript;

pub use java::JavaAnalyzer;
pub use javascript::JavaScriptAnalyzer;
pub use python::PythonAnalyzer;
pub use typescript::TypeScriptAnalyzer;

use super::LanguageAnalyzer;
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Static storage for Java analyzer.
static JAVA_ANALYZER: OnceCell<JavaAnalyzer> = OnceCell::new();

/// Static storage for JavaScript analyzer.
static JAVASCRIPT_ANALYZER: OnceCell<JavaScriptAnalyzer> = OnceCell::new();

/// Static storage for Python analyzer.
static PYTHON_ANALYZER: OnceCell<PythonAnalyzer> = OnceCell::new();

/// Static storage for TypeScript analyzer.
static TYPESCRIPT_ANALYZER: OnceCell<TypeScriptAnalyzer> = OnceCell::new();

/// Whether analyzers have been registered.
static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Register all available language analyzers.
///
/// This is idempotent - calling it multiple times is safe.
pub fn register_analyzers() {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }

    JAVA_ANALYZER.get_or_init(JavaAnalyzer::new);
    JAVASCRIPT_ANALYZER.get_or_init(JavaScriptAnalyzer::new);
    PYTHON_ANALYZER.get_or_init(PythonAnalyzer::new);
    TYPESCRIPT_ANALYZER.get_or_init(TypeScriptAnalyzer::new);
}

/// The shared Java analyzer, for extractors that need its helpers.
pub fn java_analyzer() -> &'static JavaAnalyzer {
    JAVA_ANALYZER.get_or_init(JavaAnalyzer::new)
}

/// Get an analyzer for the given file extension.
///
/// Returns None if no analyzer is registered for the extension.
pub fn get_analyzer(ext: &str) -> Option<&'static dyn LanguageAnalyzer> {
    register_analyzers();

    let registered: [Option<&'static dyn LanguageAnalyzer>; 4] = [
        JAVA_ANALYZER.get().map(|a| a as &'static dyn LanguageAnalyzer),
        JAVASCRIPT_ANALYZER.get().map(|a| a as &'static dyn LanguageAnalyzer),
        PYTHON_ANALYZER.get().map(|a| a as &'static dyn LanguageAnalyzer),
        TYPESCRIPT_ANALYZER.get().map(|a| a as &'static dyn LanguageAnalyzer),
    ];
    registered
        .into_iter()
        .flatten()
        .find(|a| a.handles_extension(ext))
}

/// Get an analyzer for a file path by its extension.
pub fn analyzer_for_path(path: &Path) -> Option<&'static dyn LanguageAnalyzer> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(get_analyzer)
}
