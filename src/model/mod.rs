//! Fact vocabulary, result envelope and parsing statistics.

mod envelope;
mod facts;
mod statistics;

pub use envelope::Envelope;
pub use facts::{
    ApiEndpoint, ApiKind, Component, ComponentKind, DataEntity, Dependency, DependencyScope,
    FactKind, FactSet, Field, MessageFlow, Relationship, RelationshipKind,
};
pub use statistics::{ErrorRecord, FailureKind, ScanStatistics, MAX_ERROR_RECORDS};
