//! Structural parse first, text fallback second.
//!
//! Each file goes through at most three tiers:
//!
//! ```text
//! read ──fail──────────────────────────────────────────▶ tier 3 (read failure)
//!  │
//!  ▼
//! parse ──clean tree──▶ structural extractor ──ok──────▶ tier 1 (HIGH)
//!  │                         └──err──────────────────▶ tier 3 (unexpected error)
//!  └──errors──▶ fallback ──facts──────────────────────▶ tier 2 (MEDIUM)
//!                  └──nothing─────────────────────────▶ tier 3 (parse failure)
//! ```

use std::fmt;
use std::fs;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SourceFile;
use crate::analysis::{analyzer_for_path, LanguageAnalyzer, ParsedFile};
use crate::model::{FailureKind, ScanStatistics};

/// How much to trust facts from one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    /// Structural parse succeeded.
    High,
    /// Text fallback produced the facts.
    Medium,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of running one file through the tiers.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome<T> {
    Parsed { facts: Vec<T>, confidence: Confidence },
    Failed { kind: FailureKind, detail: String },
}

impl<T> FileOutcome<T> {
    /// Unset for files that contributed nothing.
    pub fn confidence(&self) -> Option<Confidence> {
        match self {
            FileOutcome::Parsed { confidence, .. } => Some(*confidence),
            FileOutcome::Failed { .. } => None,
        }
    }
}

/// Per-language extraction logic plugged into the tiers.
pub trait TieredSource: Sync {
    type Fact: Send;

    /// Structural front end for `file`. Defaults to lookup by extension.
    fn analyzer(&self, file: &SourceFile) -> Option<&'static dyn LanguageAnalyzer> {
        analyzer_for_path(&file.path)
    }

    /// Extract from a clean syntax tree.
    fn structural(&self, parsed: &ParsedFile, file: &SourceFile) -> anyhow::Result<Vec<Self::Fact>>;

    /// Pattern-based extraction over raw text.
    fn fallback(&self, text: &str, file: &SourceFile) -> Vec<Self::Fact>;
}

/// Run one file through the tiers.
pub fn parse_with_fallback<S: TieredSource + ?Sized>(
    source: &S,
    file: &SourceFile,
) -> FileOutcome<S::Fact> {
    let bytes = match fs::read(&file.path) {
        Ok(b) => b,
        Err(e) => {
            return FileOutcome::Failed {
                kind: FailureKind::ReadFailure,
                detail: format!("{}: {}", file.relative, e),
            }
        }
    };

    let parsed = source
        .analyzer(file)
        .and_then(|a| a.parse(&file.path, &bytes).ok())
        .filter(|p| p.is_clean());

    if let Some(parsed) = parsed {
        return match source.structural(&parsed, file) {
            Ok(facts) => FileOutcome::Parsed {
                facts,
                confidence: Confidence::High,
            },
            Err(e) => FileOutcome::Failed {
                kind: FailureKind::UnexpectedError,
                detail: format!("{}: {}", file.relative, e),
            },
        };
    }

    let text = String::from_utf8_lossy(&bytes);
    let facts = source.fallback(&text, file);
    if facts.is_empty() {
        FileOutcome::Failed {
            kind: FailureKind::ParseFailure,
            detail: format!(
                "{}: structural parsing failed, no fallback data extracted",
                file.relative
            ),
        }
    } else {
        debug!("{}: structural parse failed, fallback found {} facts", file.relative, facts.len());
        FileOutcome::Parsed {
            facts,
            confidence: Confidence::Medium,
        }
    }
}

/// Facts and statistics from a tiered run over many files.
#[derive(Debug)]
pub struct TieredRun<T> {
    pub facts: Vec<T>,
    pub statistics: ScanStatistics,
    /// Unreadable files and structural extractor errors, one entry per file.
    pub warnings: Vec<String>,
}

/// Run every file through the tiers and fold the outcomes in file order.
///
/// With `parallel` the files are processed on the rayon pool; results are
/// collected in input order so the output matches a sequential run.
pub fn run_tiered<S: TieredSource + ?Sized>(
    source: &S,
    files: &[SourceFile],
    parallel: bool,
) -> TieredRun<S::Fact> {
    let outcomes: Vec<FileOutcome<S::Fact>> = if parallel {
        files
            .par_iter()
            .map(|f| parse_with_fallback(source, f))
            .collect()
    } else {
        files.iter().map(|f| parse_with_fallback(source, f)).collect()
    };

    let mut statistics = ScanStatistics::new(files.len());
    let mut facts = Vec::new();
    let mut warnings = Vec::new();

    for outcome in outcomes {
        match outcome {
            FileOutcome::Parsed {
                facts: found,
                confidence,
            } => {
                match confidence {
                    Confidence::High => statistics.record_parsed(),
                    Confidence::Medium => statistics.record_fallback(),
                }
                facts.extend(found);
            }
            FileOutcome::Failed { kind, detail } => {
                debug!("{}", detail);
                if kind != FailureKind::ParseFailure {
                    warnings.push(detail.clone());
                }
                statistics.record_failure(kind, detail);
            }
        }
    }

    TieredRun {
        facts,
        statistics,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::query::run_query;
    use lazy_static::lazy_static;
    use regex::Regex;
    use std::path::Path;
    use tempfile::TempDir;

    lazy_static! {
        static ref CLASS_RE: Regex = Regex::new(r"class\s+(\w+)").unwrap();
    }

    /// Collects Java class names.
    struct ClassNames;

    impl TieredSource for ClassNames {
        type Fact = String;

        fn structural(&self, parsed: &ParsedFile, file: &SourceFile) -> anyhow::Result<Vec<String>> {
            let grammar = self.analyzer(file).unwrap().grammar(&file.path);
            let matches = run_query(
                parsed,
                &grammar,
                "(class_declaration name: (identifier) @name)",
                parsed.tree.root_node(),
            )?;
            Ok(matches
                .iter()
                .filter_map(|m| m.get("name"))
                .map(|n| parsed.node_text(n).to_string())
                .collect())
        }

        fn fallback(&self, text: &str, _file: &SourceFile) -> Vec<String> {
            CLASS_RE
                .captures_iter(text)
                .map(|c| c[1].to_string())
                .collect()
        }
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) -> SourceFile {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        SourceFile {
            path,
            relative: name.to_string(),
        }
    }

    #[test]
    fn test_valid_class_is_high_confidence() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "Good.java", "public class Good { void run() {} }");
        let outcome = parse_with_fallback(&ClassNames, &file);
        assert_eq!(
            outcome,
            FileOutcome::Parsed {
                facts: vec!["Good".to_string()],
                confidence: Confidence::High
            }
        );
    }

    #[test]
    fn test_unbalanced_class_falls_back_to_medium() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "Broken.java", "class Broken {");
        let outcome = parse_with_fallback(&ClassNames, &file);
        assert_eq!(outcome.confidence(), Some(Confidence::Medium));
        match outcome {
            FileOutcome::Parsed { facts, .. } => assert!(facts.contains(&"Broken".to_string())),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_is_high_with_no_facts() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "Empty.java", "");
        let outcome = parse_with_fallback(&ClassNames, &file);
        assert_eq!(
            outcome,
            FileOutcome::Parsed {
                facts: Vec::new(),
                confidence: Confidence::High
            }
        );
    }

    #[test]
    fn test_garbage_is_parse_failure() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "Junk.java", "}}} ((( ;;; @@");
        let outcome = parse_with_fallback(&ClassNames, &file);
        match outcome {
            FileOutcome::Failed { kind, detail } => {
                assert_eq!(kind, FailureKind::ParseFailure);
                assert!(detail.starts_with("Junk.java"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_read_failure() {
        let file = SourceFile {
            path: Path::new("/nonexistent/Nope.java").to_path_buf(),
            relative: "Nope.java".to_string(),
        };
        let outcome = parse_with_fallback(&ClassNames, &file);
        assert!(matches!(
            outcome,
            FileOutcome::Failed {
                kind: FailureKind::ReadFailure,
                ..
            }
        ));
    }

    #[test]
    fn test_run_tiered_statistics_and_order() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write_file(&dir, "A.java", "class A {}"),
            write_file(&dir, "B.java", "class B {"),
            write_file(&dir, "C.java", "}}} ((( ;;; @@"),
            write_file(&dir, "D.java", "class D {}"),
        ];

        let sequential = run_tiered(&ClassNames, &files, false);
        assert_eq!(sequential.facts, vec!["A", "B", "D"]);
        let stats = &sequential.statistics;
        assert_eq!(stats.files_discovered, 4);
        assert_eq!(stats.files_scanned, 4);
        assert_eq!(stats.parsed, 2);
        assert_eq!(stats.fallback, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.errors.len(), 1);
        assert_eq!(stats.error_counts.get("parse failure"), Some(&1));
        assert!(sequential.warnings.is_empty());

        let parallel = run_tiered(&ClassNames, &files, true);
        assert_eq!(parallel.facts, sequential.facts);
        assert_eq!(parallel.statistics, sequential.statistics);
    }
}
