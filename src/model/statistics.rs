//! Per-extractor parsing statistics.
//!
//! Statistics are diagnostic only: they are folded from per-file outcomes and
//! never influence which facts are produced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum number of individual error records kept per run.
pub const MAX_ERROR_RECORDS: usize = 10;

/// Why a file ended in tier 3 (no facts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Structural parse failed and the fallback found nothing.
    ParseFailure,
    /// The file could not be read.
    ReadFailure,
    /// The structural extractor itself reported an error.
    UnexpectedError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ParseFailure => "parse failure",
            FailureKind::ReadFailure => "read failure",
            FailureKind::UnexpectedError => "unexpected error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: FailureKind,
    pub detail: String,
}

/// Counters for one tiered extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub files_discovered: usize,
    pub files_scanned: usize,
    /// Tier 1: structural parse succeeded.
    pub parsed: usize,
    /// Tier 2: fallback produced facts.
    pub fallback: usize,
    /// Tier 3: no facts.
    pub failed: usize,
    /// Failure counts keyed by category name.
    pub error_counts: BTreeMap<String, usize>,
    /// First errors encountered, capped at `MAX_ERROR_RECORDS`.
    pub errors: Vec<ErrorRecord>,
}

impl ScanStatistics {
    pub fn new(files_discovered: usize) -> Self {
        Self {
            files_discovered,
            ..Default::default()
        }
    }

    pub fn record_parsed(&mut self) {
        self.files_scanned += 1;
        self.parsed += 1;
    }

    pub fn record_fallback(&mut self) {
        self.files_scanned += 1;
        self.fallback += 1;
    }

    pub fn record_failure(&mut self, kind: FailureKind, detail: impl Into<String>) {
        self.files_scanned += 1;
        self.failed += 1;
        *self.error_counts.entry(kind.as_str().to_string()).or_insert(0) += 1;
        if self.errors.len() < MAX_ERROR_RECORDS {
            self.errors.push(ErrorRecord {
                kind,
                detail: detail.into(),
            });
        }
    }

    fn rate(&self, count: usize) -> f64 {
        if self.files_scanned == 0 {
            0.0
        } else {
            count as f64 / self.files_scanned as f64
        }
    }

    /// Fraction of scanned files handled by the structural tier.
    pub fn success_rate(&self) -> f64 {
        self.rate(self.parsed)
    }

    /// Fraction of scanned files that produced a result from either tier.
    pub fn overall_parse_rate(&self) -> f64 {
        self.rate(self.parsed + self.fallback)
    }

    pub fn failure_rate(&self) -> f64 {
        self.rate(self.failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn used_fallback(&self) -> bool {
        self.fallback > 0
    }

    /// Add another run's counters into this one.
    pub fn merge(&mut self, other: &ScanStatistics) {
        self.files_discovered += other.files_discovered;
        self.files_scanned += other.files_scanned;
        self.parsed += other.parsed;
        self.fallback += other.fallback;
        self.failed += other.failed;
        for (kind, count) in &other.error_counts {
            *self.error_counts.entry(kind.clone()).or_insert(0) += count;
        }
        for record in &other.errors {
            if self.errors.len() >= MAX_ERROR_RECORDS {
                break;
            }
            self.errors.push(record.clone());
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} scanned, {} parsed ({:.1}%), {} fallback, {} failed",
            self.files_scanned,
            self.parsed,
            self.success_rate() * 100.0,
            self.fallback,
            self.failed
        )
    }
}
