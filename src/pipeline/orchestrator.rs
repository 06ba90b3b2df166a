//! Runs extractors in order and threads their output forward.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::aggregate::{aggregate, envelope_log, AggregatedFacts, LogEntry};
use crate::extract::{Extractor, ExtractorRegistry, Repository, RunContext};
use crate::model::{Envelope, ScanStatistics};

/// Setting key for the per-extractor time budget in milliseconds.
pub const BUDGET_SETTING: &str = "extractor_budget_ms";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Skipped => "skipped",
        }
    }
}

/// What happened to one extractor during a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorRun {
    pub id: String,
    pub display_name: String,
    pub priority: i32,
    pub status: RunStatus,
    pub fact_count: usize,
    pub warning_count: usize,
    pub error_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ScanStatistics>,
    pub duration_ms: u64,
}

/// Everything a scan produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// One record per registered extractor, in run order.
    pub runs: Vec<ExtractorRun>,
    /// Envelopes of extractors that ran, in run order.
    pub envelopes: Vec<Envelope>,
    /// Warnings and errors from every envelope, in run order.
    pub log: Vec<LogEntry>,
    pub aggregate: AggregatedFacts,
}

impl ScanOutcome {
    pub fn envelope(&self, extractor_id: &str) -> Option<&Envelope> {
        self.envelopes.iter().find(|e| e.extractor_id() == extractor_id)
    }

    pub fn has_failures(&self) -> bool {
        self.runs.iter().any(|r| r.status == RunStatus::Failed)
    }

    /// Parsing statistics summed over every extractor that reported them.
    pub fn combined_statistics(&self) -> ScanStatistics {
        let mut total = ScanStatistics::default();
        for stats in self.runs.iter().filter_map(|r| r.statistics.as_ref()) {
            total.merge(stats);
        }
        total
    }
}

/// Sequential pipeline over a registry.
pub struct Orchestrator<'r> {
    registry: &'r ExtractorRegistry,
    budget: Option<Duration>,
}

impl<'r> Orchestrator<'r> {
    pub fn new(registry: &'r ExtractorRegistry) -> Self {
        Self {
            registry,
            budget: None,
        }
    }

    /// Warn when a single extractor runs longer than `budget`.
    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget = budget;
        self
    }

    /// Scan a repository with every registered extractor.
    ///
    /// Never fails: extractor failures and panics become failed envelopes.
    pub fn run(&self, repo: &Repository) -> ScanOutcome {
        let start = Instant::now();
        let budget = self.budget.or_else(|| budget_from_settings(repo));
        info!("Starting extraction for: {}", repo.root().display());

        let mut envelopes: Vec<Envelope> = Vec::new();
        let mut runs = Vec::with_capacity(self.registry.len());
        let mut log = Vec::new();

        for extractor in self.registry.ordered() {
            let id = extractor.id().to_string();
            let ctx = RunContext::new(repo, &envelopes, &id, extractor.reads());

            let applies = match guarded(|| extractor.applies_to(&ctx)) {
                Ok(applies) => applies,
                Err(message) => {
                    error!("Extractor {} panicked in applies_to: {}", id, message);
                    let env = Envelope::failed(&id, vec![format!("applies_to panicked: {}", message)]);
                    runs.push(run_record(extractor, &env, Duration::ZERO));
                    log.extend(envelope_log(&env));
                    envelopes.push(env);
                    continue;
                }
            };

            if !applies {
                debug!("Extractor {} does not apply, skipping", id);
                runs.push(ExtractorRun {
                    id: id.clone(),
                    display_name: extractor.display_name().to_string(),
                    priority: extractor.priority(),
                    status: RunStatus::Skipped,
                    fact_count: 0,
                    warning_count: 0,
                    error_count: 0,
                    statistics: None,
                    duration_ms: 0,
                });
                continue;
            }

            info!("Extractor: {}", extractor.display_name());
            let extractor_start = Instant::now();
            let mut env = match guarded(|| extractor.extract(&ctx)) {
                Ok(env) => env,
                Err(message) => {
                    error!("Extractor {} panicked: {}", id, message);
                    Envelope::failed(&id, vec![format!("extractor panicked: {}", message)])
                }
            };
            let elapsed = extractor_start.elapsed();

            if env.extractor_id() != id {
                warn!(
                    "Extractor {} returned an envelope labelled {}, relabelling",
                    id,
                    env.extractor_id()
                );
                env = relabel(env, &id);
            }

            if let Some(limit) = budget {
                if elapsed > limit {
                    warn!("Extractor {} exceeded its budget: {:?} > {:?}", id, elapsed, limit);
                    env.push_warning(format!(
                        "exceeded time budget: took {} ms, budget {} ms",
                        elapsed.as_millis(),
                        limit.as_millis()
                    ));
                }
            }

            if env.is_success() {
                debug!(
                    "Extractor {} complete: {} facts, {} warnings",
                    id,
                    env.fact_count(),
                    env.warnings().len()
                );
            } else {
                warn!("Extractor {} failed: {}", id, env.errors().join("; "));
            }

            runs.push(run_record(extractor, &env, elapsed));
            log.extend(envelope_log(&env));
            envelopes.push(env);
        }

        let aggregate = aggregate(&envelopes);
        info!(
            "Extraction complete: {} facts from {} extractors in {:?}",
            aggregate.total(),
            envelopes.len(),
            start.elapsed()
        );

        ScanOutcome {
            runs,
            envelopes,
            log,
            aggregate,
        }
    }
}

fn budget_from_settings(repo: &Repository) -> Option<Duration> {
    repo.settings()
        .get(BUDGET_SETTING)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Run `f`, turning a panic into its message.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        }
    })
}

fn run_record(extractor: &dyn Extractor, env: &Envelope, elapsed: Duration) -> ExtractorRun {
    ExtractorRun {
        id: extractor.id().to_string(),
        display_name: extractor.display_name().to_string(),
        priority: extractor.priority(),
        status: if env.is_success() {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        },
        fact_count: env.fact_count(),
        warning_count: env.warnings().len(),
        error_count: env.errors().len(),
        statistics: env.statistics().cloned(),
        duration_ms: elapsed.as_millis() as u64,
    }
}

/// Envelopes are keyed by the id the registry knows, whatever the extractor wrote.
fn relabel(env: Envelope, id: &str) -> Envelope {
    let relabelled = if env.is_success() {
        Envelope::success(id, env.facts().clone())
    } else {
        Envelope::failed(id, env.errors().to_vec())
    };
    let relabelled = relabelled.with_warnings(env.warnings().to_vec());
    match env.statistics() {
        Some(stats) => relabelled.with_statistics(stats.clone()),
        None => relabelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiEndpoint, FactKind, FactSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Emits one endpoint and records how many prior envelopes it saw.
    struct Probe {
        id: &'static str,
        priority: i32,
        seen: Arc<AtomicUsize>,
    }

    impl Extractor for Probe {
        fn id(&self) -> &str {
            self.id
        }
        fn display_name(&self) -> &str {
            self.id
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn reads(&self) -> &[FactKind] {
            &[FactKind::ApiEndpoint]
        }
        fn applies_to(&self, _ctx: &RunContext) -> bool {
            true
        }
        fn extract(&self, ctx: &RunContext) -> Envelope {
            self.seen
                .store(ctx.prior_facts().endpoints().count(), Ordering::SeqCst);
            assert!(ctx.envelope(self.id).is_none());
            let mut facts = FactSet::new();
            facts
                .endpoints
                .push(ApiEndpoint::rest(self.id, "GET", format!("/{}", self.id)));
            Envelope::success(self.id, facts)
        }
    }

    struct Panics;

    impl Extractor for Panics {
        fn id(&self) -> &str {
            "panics"
        }
        fn display_name(&self) -> &str {
            "Panics"
        }
        fn priority(&self) -> i32 {
            20
        }
        fn applies_to(&self, _ctx: &RunContext) -> bool {
            true
        }
        fn extract(&self, _ctx: &RunContext) -> Envelope {
            panic!("grammar exploded")
        }
    }

    struct NeverApplies;

    impl Extractor for NeverApplies {
        fn id(&self) -> &str {
            "never"
        }
        fn display_name(&self) -> &str {
            "Never"
        }
        fn priority(&self) -> i32 {
            5
        }
        fn applies_to(&self, _ctx: &RunContext) -> bool {
            false
        }
        fn extract(&self, _ctx: &RunContext) -> Envelope {
            unreachable!("not applicable")
        }
    }

    fn probe(id: &'static str, priority: i32) -> (Probe, Arc<AtomicUsize>) {
        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        (
            Probe {
                id,
                priority,
                seen: seen.clone(),
            },
            seen,
        )
    }

    #[test]
    fn test_later_extractors_see_earlier_output_only() {
        let (late, late_seen) = probe("late", 100);
        let (early, early_seen) = probe("early", 1);
        let registry = ExtractorRegistry::builder()
            .register(late)
            .register(early)
            .build()
            .unwrap();

        let repo = Repository::new("/nonexistent");
        let outcome = Orchestrator::new(&registry).run(&repo);

        assert_eq!(early_seen.load(Ordering::SeqCst), 0);
        assert_eq!(late_seen.load(Ordering::SeqCst), 1);
        let ids: Vec<_> = outcome.runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(outcome.aggregate.endpoints.len(), 2);
    }

    #[test]
    fn test_panic_becomes_failed_envelope() {
        let (after, after_seen) = probe("after", 50);
        let registry = ExtractorRegistry::builder()
            .register(Panics)
            .register(after)
            .build()
            .unwrap();

        let repo = Repository::new("/nonexistent");
        let outcome = Orchestrator::new(&registry).run(&repo);

        let failed = outcome.envelope("panics").unwrap();
        assert!(!failed.is_success());
        assert!(failed.facts().is_empty());
        assert!(failed.errors()[0].contains("grammar exploded"));
        assert!(outcome.has_failures());

        assert_eq!(after_seen.load(Ordering::SeqCst), 0);
        assert!(outcome.envelope("after").unwrap().is_success());
        assert_eq!(outcome.log.len(), 1);
        assert_eq!(outcome.log[0].extractor_id, "panics");
    }

    #[test]
    fn test_skipped_extractor_stores_no_envelope() {
        let registry = ExtractorRegistry::builder()
            .register(NeverApplies)
            .build()
            .unwrap();
        let repo = Repository::new("/nonexistent");
        let outcome = Orchestrator::new(&registry).run(&repo);
        assert!(outcome.envelopes.is_empty());
        assert_eq!(outcome.runs[0].status, RunStatus::Skipped);
    }

    struct Slow;

    impl Extractor for Slow {
        fn id(&self) -> &str {
            "slow"
        }
        fn display_name(&self) -> &str {
            "Slow"
        }
        fn priority(&self) -> i32 {
            1
        }
        fn applies_to(&self, _ctx: &RunContext) -> bool {
            true
        }
        fn extract(&self, _ctx: &RunContext) -> Envelope {
            std::thread::sleep(Duration::from_millis(20));
            Envelope::empty("slow")
        }
    }

    #[test]
    fn test_budget_overrun_adds_warning() {
        let registry = ExtractorRegistry::builder().register(Slow).build().unwrap();
        let repo = Repository::new("/nonexistent").with_setting(BUDGET_SETTING, "1");
        let outcome = Orchestrator::new(&registry).run(&repo);
        let env = outcome.envelope("slow").unwrap();
        assert!(env.is_success());
        assert_eq!(env.warnings().len(), 1);
        assert!(env.warnings()[0].starts_with("exceeded time budget"));
    }
}
