//! Built-in extractors.
//!
//! | id | priority | facts |
//! |----|----------|-------|
//! | `maven-dependencies` | 10 | components, dependencies |
//! | `npm-dependencies` | 10 | components, dependencies |
//! | `go-modules` | 10 | components, dependencies |
//! | `spring-rest-api` | 50 | endpoints |
//! | `fastapi-routes` | 50 | endpoints |
//! | `express-routes` | 50 | endpoints |
//! | `jpa-entities` | 60 | entities |
//! | `kafka-messaging` | 70 | message flows |
//! | `rest-event-flow` | 150 | message flows inferred from endpoints |

mod express;
mod fastapi;
mod gomod;
mod jpa;
mod kafka;
mod maven;
mod npm;
mod rest_event_flow;
mod spring;

pub use express::ExpressRoutesExtractor;
pub use fastapi::FastApiRoutesExtractor;
pub use gomod::GoModulesExtractor;
pub use jpa::JpaEntitiesExtractor;
pub use kafka::KafkaMessagingExtractor;
pub use maven::MavenDependenciesExtractor;
pub use npm::NpmDependenciesExtractor;
pub use rest_event_flow::RestEventFlowExtractor;
pub use spring::SpringRestApiExtractor;

use tracing::{debug, warn};

use crate::extract::{ExtractError, ExtractorRegistry, RegistryError, RunContext, SourceFile, TieredRun};
use crate::model::{Envelope, FactSet, FailureKind, ScanStatistics};

/// Global setting that enables per-file parallelism.
pub const PARALLEL_SETTING: &str = "parallel";

/// Every built-in extractor, in registration order.
pub fn builtin_registry() -> Result<ExtractorRegistry, RegistryError> {
    ExtractorRegistry::builder()
        .register(MavenDependenciesExtractor)
        .register(NpmDependenciesExtractor)
        .register(GoModulesExtractor)
        .register(SpringRestApiExtractor)
        .register(FastApiRoutesExtractor)
        .register(ExpressRoutesExtractor)
        .register(JpaEntitiesExtractor)
        .register(KafkaMessagingExtractor)
        .register(RestEventFlowExtractor)
        .build()
}

fn parallel(ctx: &RunContext) -> bool {
    ctx.setting_bool(PARALLEL_SETTING, false)
}

/// Envelope for a tiered run: facts placed by `place`, per-file problems as warnings.
fn tiered_envelope<T>(
    id: &str,
    run: TieredRun<T>,
    place: impl FnOnce(Vec<T>, &mut FactSet),
) -> Envelope {
    let mut facts = FactSet::new();
    place(run.facts, &mut facts);
    debug!(
        extractor = id,
        "{} ({} facts)",
        run.statistics.summary(),
        facts.len()
    );
    Envelope::success(id, facts)
        .with_warnings(run.warnings)
        .with_statistics(run.statistics)
}

/// Parse each manifest independently; a bad manifest becomes a warning and
/// the rest are still reported.
fn collect_manifests(
    id: &str,
    files: &[SourceFile],
    mut parse: impl FnMut(&SourceFile, &str) -> Result<FactSet, ExtractError>,
) -> Envelope {
    let mut statistics = ScanStatistics::new(files.len());
    let mut facts = FactSet::new();
    let mut warnings = Vec::new();

    for file in files {
        let result = std::fs::read_to_string(&file.path)
            .map_err(|source| ExtractError::Io {
                path: file.relative.clone(),
                source,
            })
            .and_then(|content| parse(file, &content));

        match result {
            Ok(found) => {
                statistics.record_parsed();
                facts.extend(found);
            }
            Err(e) => {
                warn!(extractor = id, "{}", e);
                let kind = match e {
                    ExtractError::Io { .. } => FailureKind::ReadFailure,
                    ExtractError::Parse { .. } => FailureKind::ParseFailure,
                };
                statistics.record_failure(kind, e.to_string());
                warnings.push(e.to_string());
            }
        }
    }

    Envelope::success(id, facts)
        .with_warnings(warnings)
        .with_statistics(statistics)
}

/// `app/routers/orders.py` -> `app.routers.orders`; `pkg/__init__.py` -> `pkg`.
fn module_path(relative: &str) -> String {
    let stem = match relative.rfind('.') {
        Some(dot) if dot > relative.rfind('/').map(|s| s + 1).unwrap_or(0) => &relative[..dot],
        _ => relative,
    };
    let stem = stem.strip_suffix("/__init__").unwrap_or(stem);
    stem.replace('/', ".")
}

/// Join a prefix and a route, normalizing slashes. Both empty gives `/`.
fn combine_paths(base: &str, path: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let path = match path.trim() {
        "/" => "",
        p => p,
    };
    let joined = if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    };
    if joined.is_empty() {
        "/".to_string()
    } else if joined.starts_with('/') {
        joined
    } else {
        format!("/{}", joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_is_valid() {
        let registry = builtin_registry().unwrap();
        assert_eq!(registry.len(), 9);
        let ordered: Vec<_> = registry.ordered().iter().map(|e| e.id()).collect();
        assert_eq!(ordered.first(), Some(&"maven-dependencies"));
        assert_eq!(ordered.last(), Some(&"rest-event-flow"));
        let kafka = ordered.iter().position(|id| *id == "kafka-messaging").unwrap();
        let maven = ordered.iter().position(|id| *id == "maven-dependencies").unwrap();
        assert!(maven < kafka);
    }

    #[test]
    fn test_module_path() {
        assert_eq!(module_path("app/routers/orders.py"), "app.routers.orders");
        assert_eq!(module_path("pkg/__init__.py"), "pkg");
        assert_eq!(module_path("main.py"), "main");
        assert_eq!(module_path("src/routes/users.ts"), "src.routes.users");
    }

    #[test]
    fn test_combine_paths() {
        assert_eq!(combine_paths("/api/orders", "/{id}"), "/api/orders/{id}");
        assert_eq!(combine_paths("/api/", "items"), "/api/items");
        assert_eq!(combine_paths("", "/health"), "/health");
        assert_eq!(combine_paths("/api", ""), "/api");
        assert_eq!(combine_paths("", ""), "/");
        assert_eq!(combine_paths("api", "x"), "/api/x");
        assert_eq!(combine_paths("/api/users", "/"), "/api/users");
        assert_eq!(combine_paths("", "/"), "/");
    }
}
