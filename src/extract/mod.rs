//! The extractor contract and the machinery extractors share.
//!
//! An extractor is a self-contained unit that inspects a repository and
//! returns an [`Envelope`] of facts. Extractors never return errors or panic
//! on bad input: total failure is reported as a failed envelope, per-file
//! problems as warnings on a successful one.
//!
//! # Writing an Extractor
//!
//! 1. Implement [`Extractor`] (pick a unique id and a priority)
//! 2. For source files, implement [`TieredSource`] and call [`run_tiered`]
//! 3. Register it in `extractors::builtin_registry`

pub mod applicability;
mod context;
mod registry;
mod tiered;

pub use context::{PriorFacts, Repository, RunContext, SourceFile};
pub use registry::{ExtractorRegistry, RegistryBuilder, RegistryError};
pub use tiered::{parse_with_fallback, run_tiered, Confidence, FileOutcome, TieredRun, TieredSource};

use thiserror::Error;

use crate::model::{Envelope, FactKind};

/// Errors an extractor may hit while handling one file.
///
/// These are converted into envelope warnings, never propagated.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

impl ExtractError {
    pub fn parse(path: impl Into<String>, message: impl ToString) -> Self {
        ExtractError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// A pluggable fact extractor.
pub trait Extractor: Send + Sync {
    /// Globally unique, stable identifier (e.g. "spring-rest-api").
    fn id(&self) -> &str;

    /// Human-readable name.
    fn display_name(&self) -> &str;

    /// Lower runs earlier. Ties keep registration order.
    fn priority(&self) -> i32;

    /// Fact kinds this extractor reads from earlier envelopes.
    fn reads(&self) -> &[FactKind] {
        &[]
    }

    /// Selection groups for configuration (e.g. "java", "messaging").
    fn groups(&self) -> &[&'static str] {
        &[]
    }

    /// Cheap applicability check. Must not fail.
    fn applies_to(&self, ctx: &RunContext) -> bool;

    /// Run the extraction. Must not fail or panic.
    fn extract(&self, ctx: &RunContext) -> Envelope;
}
