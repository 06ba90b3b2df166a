//! Extraction pipeline: ordering, context threading and aggregation.
//!
//! ```text
//! registry ──ordered()──▶ extractor 1 ──envelope──┐
//!                         extractor 2 ◀──context──┤
//!                         ...                     │
//!                         extractor N ◀──context──┘
//!                                │
//!                                ▼
//!                         aggregate (attributed facts + log)
//! ```

mod aggregate;
mod orchestrator;

pub use aggregate::{aggregate, envelope_log, AggregatedFacts, Attributed, LogEntry, Severity};
pub use orchestrator::{ExtractorRun, Orchestrator, RunStatus, ScanOutcome, BUDGET_SETTING};
