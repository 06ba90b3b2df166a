//! Extraction quality report.
//!
//! Summarizes how well the tiered extractors coped with the repository:
//! how many files parsed structurally, how many needed the fallback, and
//! which extractors look unreliable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pipeline::{RunStatus, ScanOutcome};

/// Confidence weights per tier.
pub mod weights {
    pub const HIGH: f64 = 1.0;
    pub const MEDIUM: f64 = 0.7;
    pub const NONE: f64 = 0.0;
}

/// Failure rate at or above which an extractor gets a warning gap.
pub const FAILURE_RATE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapSeverity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for GapSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapSeverity::Info => write!(f, "info"),
            GapSeverity::Warning => write!(f, "warning"),
            GapSeverity::Error => write!(f, "error"),
        }
    }
}

/// Something a reader of the facts should know is missing or shaky.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub severity: GapSeverity,
    pub extractor_id: String,
    pub message: String,
}

/// Files per confidence level, summed over all tiered extractors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub high: usize,
    pub medium: usize,
    pub none: usize,
}

impl ConfidenceBreakdown {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.none
    }

    /// Weighted confidence in [0, 1]; 1.0 when nothing was scanned.
    pub fn score(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 1.0;
        }
        let weighted = self.high as f64 * weights::HIGH
            + self.medium as f64 * weights::MEDIUM
            + self.none as f64 * weights::NONE;
        weighted / total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub files_scanned: usize,
    pub parsed: usize,
    pub fallback: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub overall_parse_rate: f64,
    pub confidence: ConfidenceBreakdown,
    pub confidence_score: f64,
    pub gaps: Vec<Gap>,
}

impl QualityReport {
    pub fn has_errors(&self) -> bool {
        self.gaps.iter().any(|g| g.severity == GapSeverity::Error)
    }

    pub fn gaps_at_least(&self, severity: GapSeverity) -> impl Iterator<Item = &Gap> {
        self.gaps.iter().filter(move |g| g.severity >= severity)
    }
}

/// Build the quality report for a finished scan.
pub fn assess(outcome: &ScanOutcome) -> QualityReport {
    let totals = outcome.combined_statistics();
    let confidence = ConfidenceBreakdown {
        high: totals.parsed,
        medium: totals.fallback,
        none: totals.failed,
    };

    let mut gaps = Vec::new();
    for run in &outcome.runs {
        if run.status == RunStatus::Failed {
            let reason = outcome
                .envelope(&run.id)
                .map(|e| e.errors().join("; "))
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "no reason given".to_string());
            gaps.push(Gap {
                severity: GapSeverity::Error,
                extractor_id: run.id.clone(),
                message: format!("{} failed: {}", run.display_name, reason),
            });
            continue;
        }

        if let Some(first) = outcome
            .envelope(&run.id)
            .and_then(|e| e.warnings().first())
        {
            gaps.push(Gap {
                severity: GapSeverity::Warning,
                extractor_id: run.id.clone(),
                message: format!(
                    "{} reported {} warning(s), first: {}",
                    run.display_name, run.warning_count, first
                ),
            });
        }

        let Some(stats) = &run.statistics else {
            continue;
        };
        if stats.files_scanned > 0 && stats.failure_rate() >= FAILURE_RATE_THRESHOLD {
            gaps.push(Gap {
                severity: GapSeverity::Warning,
                extractor_id: run.id.clone(),
                message: format!(
                    "{} could not extract from {} of {} files ({:.0}%)",
                    run.display_name,
                    stats.failed,
                    stats.files_scanned,
                    stats.failure_rate() * 100.0
                ),
            });
        }
        if stats.used_fallback() {
            gaps.push(Gap {
                severity: GapSeverity::Info,
                extractor_id: run.id.clone(),
                message: format!(
                    "{} used pattern fallback for {} file(s); facts have medium confidence",
                    run.display_name, stats.fallback
                ),
            });
        }
    }

    QualityReport {
        files_scanned: totals.files_scanned,
        parsed: totals.parsed,
        fallback: totals.fallback,
        failed: totals.failed,
        success_rate: totals.success_rate(),
        overall_parse_rate: totals.overall_parse_rate(),
        confidence_score: confidence.score(),
        confidence,
        gaps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Envelope, FactSet, FailureKind, ScanStatistics};
    use crate::pipeline::{aggregate, ExtractorRun};

    fn run(id: &str, status: RunStatus, statistics: Option<ScanStatistics>) -> ExtractorRun {
        ExtractorRun {
            id: id.to_string(),
            display_name: id.to_string(),
            priority: 50,
            status,
            fact_count: 0,
            warning_count: 0,
            error_count: 0,
            statistics,
            duration_ms: 1,
        }
    }

    fn outcome(runs: Vec<ExtractorRun>, envelopes: Vec<Envelope>) -> ScanOutcome {
        ScanOutcome {
            aggregate: aggregate(&envelopes),
            runs,
            envelopes,
            log: Vec::new(),
        }
    }

    #[test]
    fn test_clean_scan_has_no_gaps() {
        let mut stats = ScanStatistics::new(3);
        stats.record_parsed();
        stats.record_parsed();
        stats.record_parsed();
        let report = assess(&outcome(
            vec![run("spring", RunStatus::Succeeded, Some(stats))],
            vec![Envelope::success("spring", FactSet::new())],
        ));
        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.confidence.high, 3);
        assert!((report.confidence_score - 1.0).abs() < f64::EPSILON);
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn test_gaps() {
        let mut shaky = ScanStatistics::new(4);
        shaky.record_parsed();
        shaky.record_fallback();
        shaky.record_failure(FailureKind::ParseFailure, "a.java");
        shaky.record_failure(FailureKind::ReadFailure, "b.java");

        let report = assess(&outcome(
            vec![
                run("jpa", RunStatus::Succeeded, Some(shaky)),
                run("kafka", RunStatus::Failed, None),
                run("go", RunStatus::Skipped, None),
            ],
            vec![
                Envelope::success("jpa", FactSet::new()),
                Envelope::failed("kafka", vec!["boom".to_string()]),
            ],
        ));

        let severities: Vec<_> = report.gaps.iter().map(|g| g.severity).collect();
        assert_eq!(
            severities,
            vec![GapSeverity::Warning, GapSeverity::Info, GapSeverity::Error]
        );
        assert!(report.gaps[2].message.contains("boom"));
        assert!(report.has_errors());
        assert_eq!(report.gaps_at_least(GapSeverity::Warning).count(), 2);
        assert!((report.confidence_score - 0.425).abs() < 1e-9);
    }

    #[test]
    fn test_warnings_become_a_gap() {
        let mut warned = run("npm", RunStatus::Succeeded, None);
        warned.warning_count = 2;
        let report = assess(&outcome(
            vec![warned],
            vec![Envelope::success("npm", FactSet::new())
                .with_warning("failed to parse b/package.json: EOF")
                .with_warning("failed to parse c/package.json: EOF")],
        ));
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].severity, GapSeverity::Warning);
        assert!(report.gaps[0].message.contains("2 warning(s)"));
        assert!(report.gaps[0].message.contains("b/package.json"));
    }

    #[test]
    fn test_empty_breakdown_scores_one() {
        assert!((ConfidenceBreakdown::default().score() - 1.0).abs() < f64::EPSILON);
    }
}
