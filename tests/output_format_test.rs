//! Tests for the JSON report format.
//!
//! These scan the `testdata/shop` fixture and check the field names and
//! shapes that downstream consumers rely on.

use std::path::PathBuf;

use archfacts::quality;
use archfacts::report::{self, JsonProject, JsonReport};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("shop")
}

/// Scan the fixture and build the JSON report.
fn run_and_get_json(dedupe: bool) -> JsonReport {
    let outcome = archfacts::scan(fixture_path()).expect("builtin registry should be valid");
    let facts = if dedupe {
        outcome.aggregate.clone().deduplicated()
    } else {
        outcome.aggregate.clone()
    };
    let project = JsonProject {
        name: "shop".to_string(),
        version: "1.2.0".to_string(),
        description: None,
        path: fixture_path().to_string_lossy().to_string(),
    };
    let quality = quality::assess(&outcome);
    report::json_report(project, &outcome, facts, quality)
}

#[test]
fn test_json_report_structure() {
    let report = run_and_get_json(false);

    assert!(!report.tool_version.is_empty(), "version should not be empty");
    assert_eq!(report.project.name, "shop");
    assert!(report.success, "fixture scan should succeed");
    assert_eq!(report.extractors.len(), 9);
    assert!(report.statistics.files_scanned > 0, "should have scanned files");
    assert!(report.facts.total() > 0, "should have found facts");
}

#[test]
fn test_json_field_names() {
    let report = run_and_get_json(false);
    let json = serde_json::to_string(&report).expect("should serialize");

    // Top level
    for field in [
        "tool_version",
        "project",
        "success",
        "extractors",
        "facts",
        "log",
        "statistics",
        "quality",
    ] {
        assert!(json.contains(&format!("\"{}\"", field)), "missing '{}' field", field);
    }

    // Extractor records
    assert!(json.contains("\"status\":\"succeeded\""));
    assert!(json.contains("\"fact_count\""));
    assert!(json.contains("\"duration_ms\""));

    // Attributed facts carry their extractor inline
    assert!(json.contains("\"extractor_id\":\"spring-rest-api\""));
    assert!(json.contains("\"verb\":\"POST\""));
    assert!(json.contains("\"kind\":\"REST\""));

    // Quality
    assert!(json.contains("\"confidence_score\""));
    assert!(json.contains("\"gaps\""));
}

#[test]
fn test_json_serialization_round_trip() {
    let report = run_and_get_json(false);

    let json = serde_json::to_string_pretty(&report).expect("should serialize to JSON");
    let parsed: JsonReport = serde_json::from_str(&json).expect("should deserialize from JSON");

    assert_eq!(parsed.facts, report.facts);
    assert_eq!(parsed.extractors, report.extractors);
    assert_eq!(parsed.log, report.log);
    assert_eq!(parsed.quality.gaps, report.quality.gaps);
}

#[test]
fn test_dedupe_never_adds_facts() {
    let full = run_and_get_json(false);
    let deduped = run_and_get_json(true);

    assert!(deduped.facts.total() <= full.facts.total());
    assert_eq!(deduped.facts.clone().deduplicated(), deduped.facts);
    // Only the facts section changes.
    assert_eq!(deduped.extractors.len(), full.extractors.len());
    assert_eq!(deduped.statistics, full.statistics);
}
