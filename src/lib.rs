//! Archfacts - architecture fact extraction.
//!
//! Archfacts mines a source repository for architecture facts: components,
//! dependencies, API endpoints, data entities, message flows and the
//! relationships between them. Facts come from pluggable extractors that run
//! in a fixed order, each seeing the results of the ones before it.
//!
//! # Architecture
//!
//! - `model`: fact types, the result `Envelope` and parsing statistics
//! - `extract`: the `Extractor` trait, registry, run context and tiered parsing
//! - `analysis`: tree-sitter front ends used by the structural tier
//! - `extractors`: the built-in extractors
//! - `pipeline`: orchestration and aggregation
//! - `config`: YAML project configuration
//! - `quality`, `report`: scan quality assessment and output formatting
//!
//! # Adding an Extractor
//!
//! See `src/extractors/` for examples. Implement `Extractor` (and
//! `TieredSource` for source files) and register it in
//! `extractors::builtin_registry`.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod extract;
pub mod extractors;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod quality;
pub mod report;

pub use config::{ConfigError, ProjectConfig};
pub use extract::{Extractor, ExtractorRegistry, Repository, RunContext};
pub use extractors::builtin_registry;
pub use model::{Envelope, FactKind, FactSet};
pub use pipeline::{Orchestrator, ScanOutcome};

/// Scan `root` with every built-in extractor and default configuration.
pub fn scan(root: impl Into<std::path::PathBuf>) -> Result<ScanOutcome, extract::RegistryError> {
    let registry = builtin_registry()?;
    let repo = Repository::new(root);
    Ok(Orchestrator::new(&registry).run(&repo))
}
