//! TypeScript front end. `.tsx` files use the TSX dialect.

use std::path::Path;

use tree_sitter::Language;

use crate::analysis::LanguageAnalyzer;

pub struct TypeScriptAnalyzer {
    typescript: Language,
    tsx: Language,
}

impl TypeScriptAnalyzer {
    pub fn new() -> Self {
        Self {
            typescript: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            tsx: tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

impl Default for TypeScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for TypeScriptAnalyzer {
    fn language_id(&self) -> &'static str {
        "typescript"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "mts"]
    }

    fn grammar(&self, path: &Path) -> Language {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsx") => self.tsx.clone(),
            _ => self.typescript.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsx_uses_jsx_aware_grammar() {
        let analyzer = TypeScriptAnalyzer::new();
        let source = b"const App = () => <div>hi</div>;\n";
        let tsx = analyzer.parse(Path::new("App.tsx"), source).unwrap();
        assert!(tsx.is_clean());
    }
}
