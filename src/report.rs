//! Output formatting for scan results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: the full outcome for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};

use crate::model::{FactKind, ScanStatistics};
use crate::pipeline::{AggregatedFacts, ExtractorRun, LogEntry, RunStatus, ScanOutcome, Severity};
use crate::quality::{GapSeverity, QualityReport};

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonProject {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub tool_version: String,
    pub project: JsonProject,
    pub success: bool,
    pub extractors: Vec<ExtractorRun>,
    pub facts: AggregatedFacts,
    pub log: Vec<LogEntry>,
    pub statistics: ScanStatistics,
    pub quality: QualityReport,
}

/// Assemble the JSON report. `facts` is the (possibly deduplicated) aggregate.
pub fn json_report(
    project: JsonProject,
    outcome: &ScanOutcome,
    facts: AggregatedFacts,
    quality: QualityReport,
) -> JsonReport {
    JsonReport {
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        project,
        success: !outcome.has_failures(),
        extractors: outcome.runs.clone(),
        facts,
        log: outcome.log.clone(),
        statistics: outcome.combined_statistics(),
        quality,
    }
}

pub fn write_json(report: &JsonReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

pub fn write_pretty(
    project: &JsonProject,
    outcome: &ScanOutcome,
    facts: &AggregatedFacts,
    quality: &QualityReport,
) {
    // Header
    println!();
    print!("  ");
    print!("{}", "archfacts".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", project.path);
    print!("  {}", "Project:  ".dimmed());
    if project.version.is_empty() {
        println!("{}", project.name);
    } else {
        println!("{} {}", project.name, project.version.dimmed());
    }
    println!();

    write_runs(&outcome.runs);
    println!();

    if !outcome.log.is_empty() {
        write_log(&outcome.log);
        println!();
    }

    write_totals(facts);
    println!();

    write_quality(quality);
    println!();

    write_final_status(outcome);
    println!();
}

fn write_runs(runs: &[ExtractorRun]) {
    println!("  {} ({}):", "Extractors".bold(), runs.len());
    println!();

    for run in runs {
        write_status_tag(run.status);
        print!("   {:<22}", run.id.blue());
        match run.status {
            RunStatus::Skipped => print!("{}", "not applicable".dimmed()),
            _ => {
                print!("{:>4} facts", run.fact_count);
                print!("  {}", format!("{:>5} ms", run.duration_ms).dimmed());
                if let Some(stats) = &run.statistics {
                    print!("  {}", tier_counts(stats).dimmed());
                }
            }
        }
        println!();
    }
}

fn tier_counts(stats: &ScanStatistics) -> String {
    format!(
        "high {} / medium {} / none {}",
        stats.parsed, stats.fallback, stats.failed
    )
}

fn write_status_tag(status: RunStatus) {
    match status {
        RunStatus::Succeeded => print!("    {}", "✓ OK  ".green()),
        RunStatus::Failed => print!("    {}", "✗ FAIL".red()),
        RunStatus::Skipped => print!("    {}", "- SKIP".dimmed()),
    }
}

fn write_log(log: &[LogEntry]) {
    println!("  {} ({}):", "Messages".bold(), log.len());
    println!();

    for entry in log {
        match entry.severity {
            Severity::Error => print!("    {} ", "ERROR".red()),
            Severity::Warning => print!("    {} ", "WARN ".yellow()),
        }
        print!("   {:<22}", entry.extractor_id.dimmed());
        println!("{}", entry.message);
    }
}

fn write_totals(facts: &AggregatedFacts) {
    println!("  {}", "Facts:".bold());
    for kind in FactKind::ALL {
        println!("    {:<20} {:>5}", kind.to_string(), facts.count(kind));
    }
    println!("    {:<20} {:>5}", "total".bold(), facts.total());
}

fn write_quality(quality: &QualityReport) {
    println!("  {}", "Quality:".bold());
    println!(
        "    {:<20} {:>5}",
        "files scanned", quality.files_scanned
    );
    if quality.files_scanned > 0 {
        println!(
            "    {:<20} {:>5}  ({:.1}% structural, {:.1}% overall)",
            "parsed",
            quality.parsed,
            quality.success_rate * 100.0,
            quality.overall_parse_rate * 100.0
        );
        println!("    {:<20} {:>5}", "fallback", quality.fallback);
        println!("    {:<20} {:>5}", "failed", quality.failed);
        print!("    {:<20} ", "confidence");
        write_colored_confidence(quality.confidence_score);
        println!();
    }

    if !quality.gaps.is_empty() {
        println!();
        for gap in &quality.gaps {
            match gap.severity {
                GapSeverity::Error => print!("    {} ", "ERROR".red()),
                GapSeverity::Warning => print!("    {} ", "WARN ".yellow()),
                GapSeverity::Info => print!("    {} ", "INFO ".blue()),
            }
            println!("  {}", gap.message);
        }
    }
}

fn write_colored_confidence(score: f64) {
    let text = format!("{:>5.2}", score);
    match score {
        s if s >= 0.9 => print!("{}", text.green().bold()),
        s if s >= 0.7 => print!("{}", text.green()),
        s if s >= 0.5 => print!("{}", text.yellow()),
        _ => print!("{}", text.red()),
    }
}

fn write_final_status(outcome: &ScanOutcome) {
    let failed = outcome
        .runs
        .iter()
        .filter(|r| r.status == RunStatus::Failed)
        .count();
    let ran = outcome
        .runs
        .iter()
        .filter(|r| r.status != RunStatus::Skipped)
        .count();

    print!(
        "  {}",
        format!("{} of {} extractors ran", ran, outcome.runs.len()).dimmed()
    );
    print!("  ");
    if failed == 0 {
        print!("{}", "COMPLETE".green());
    } else {
        print!("{}", format!("{} FAILED", failed).red());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiEndpoint, Envelope, FactSet};
    use crate::pipeline::aggregate;
    use crate::quality;

    fn outcome() -> ScanOutcome {
        let mut facts = FactSet::new();
        facts.endpoints.push(ApiEndpoint::rest("svc", "GET", "/orders"));
        let envelopes = vec![
            Envelope::success("spring-rest-api", facts).with_warning("skipped Broken.java"),
            Envelope::failed("kafka-messaging", vec!["boom".to_string()]),
        ];
        let runs = envelopes
            .iter()
            .map(|e| ExtractorRun {
                id: e.extractor_id().to_string(),
                display_name: e.extractor_id().to_string(),
                priority: 50,
                status: if e.is_success() {
                    RunStatus::Succeeded
                } else {
                    RunStatus::Failed
                },
                fact_count: e.fact_count(),
                warning_count: e.warnings().len(),
                error_count: e.errors().len(),
                statistics: None,
                duration_ms: 3,
            })
            .collect();
        ScanOutcome {
            aggregate: aggregate(&envelopes),
            log: envelopes.iter().flat_map(crate::pipeline::envelope_log).collect(),
            runs,
            envelopes,
        }
    }

    fn project() -> JsonProject {
        JsonProject {
            name: "shop".to_string(),
            version: String::new(),
            description: None,
            path: "/repos/shop".to_string(),
        }
    }

    #[test]
    fn test_json_report_shape() {
        let outcome = outcome();
        let report = json_report(
            project(),
            &outcome,
            outcome.aggregate.clone(),
            quality::assess(&outcome),
        );
        assert!(!report.success);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["project"]["name"], "shop");
        assert!(value["project"].get("version").is_none());
        assert_eq!(value["extractors"][1]["status"], "failed");
        assert_eq!(value["facts"]["endpoints"][0]["extractor_id"], "spring-rest-api");
        assert_eq!(value["facts"]["endpoints"][0]["path"], "/orders");
        assert_eq!(value["log"][0]["severity"], "warning");
        assert_eq!(value["log"][1]["message"], "boom");
        assert_eq!(value["quality"]["gaps"][0]["severity"], "warning");
        assert_eq!(value["quality"]["gaps"][1]["severity"], "error");
    }

    #[test]
    fn test_tier_counts() {
        let mut stats = ScanStatistics::new(2);
        stats.record_parsed();
        stats.record_fallback();
        assert_eq!(tier_counts(&stats), "high 1 / medium 1 / none 0");
    }
}
