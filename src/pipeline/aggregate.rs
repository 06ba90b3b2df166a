//! Flattening envelopes into one attributed fact set.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{
    ApiEndpoint, Component, DataEntity, Dependency, Envelope, FactKind, MessageFlow,
    Relationship,
};

/// A fact tagged with the extractor that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributed<T> {
    pub extractor_id: String,
    #[serde(flatten)]
    pub fact: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A warning or error with the extractor that reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub extractor_id: String,
    pub severity: Severity,
    pub message: String,
}

/// Log entries for one envelope: warnings first, then errors.
pub fn envelope_log(envelope: &Envelope) -> Vec<LogEntry> {
    let warnings = envelope.warnings().iter().map(|w| (Severity::Warning, w));
    let errors = envelope.errors().iter().map(|e| (Severity::Error, e));
    warnings
        .chain(errors)
        .map(|(severity, message)| LogEntry {
            extractor_id: envelope.extractor_id().to_string(),
            severity,
            message: message.clone(),
        })
        .collect()
}

/// Every fact from every successful envelope, in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedFacts {
    pub components: Vec<Attributed<Component>>,
    pub dependencies: Vec<Attributed<Dependency>>,
    pub endpoints: Vec<Attributed<ApiEndpoint>>,
    pub flows: Vec<Attributed<MessageFlow>>,
    pub entities: Vec<Attributed<DataEntity>>,
    pub relationships: Vec<Attributed<Relationship>>,
}

fn attribute<'a, T: Clone + 'a>(
    id: &str,
    facts: &'a [T],
) -> impl Iterator<Item = Attributed<T>> + 'a {
    let id = id.to_string();
    facts.iter().map(move |f| Attributed {
        extractor_id: id.clone(),
        fact: f.clone(),
    })
}

/// Flatten envelopes into one attributed fact set.
///
/// Failed envelopes contribute nothing. The result depends only on the
/// envelopes and their order.
pub fn aggregate(envelopes: &[Envelope]) -> AggregatedFacts {
    let mut out = AggregatedFacts::default();
    for env in envelopes.iter().filter(|e| e.is_success()) {
        let id = env.extractor_id();
        out.components.extend(attribute(id, env.components()));
        out.dependencies.extend(attribute(id, env.dependencies()));
        out.endpoints.extend(attribute(id, env.endpoints()));
        out.flows.extend(attribute(id, env.flows()));
        out.entities.extend(attribute(id, env.entities()));
        out.relationships.extend(attribute(id, env.relationships()));
    }
    out
}

fn dedup_by_key<T>(items: &mut Vec<Attributed<T>>, key: impl Fn(&T) -> String) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(key(&item.fact)));
}

impl AggregatedFacts {
    pub fn total(&self) -> usize {
        FactKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    pub fn count(&self, kind: FactKind) -> usize {
        match kind {
            FactKind::Component => self.components.len(),
            FactKind::Dependency => self.dependencies.len(),
            FactKind::ApiEndpoint => self.endpoints.len(),
            FactKind::MessageFlow => self.flows.len(),
            FactKind::DataEntity => self.entities.len(),
            FactKind::Relationship => self.relationships.len(),
        }
    }

    /// Drop facts whose natural key was already seen, keeping the first.
    pub fn deduplicated(mut self) -> Self {
        dedup_by_key(&mut self.components, |c| c.id.clone());
        dedup_by_key(&mut self.dependencies, |d| d.coordinate());
        dedup_by_key(&mut self.endpoints, |e| {
            format!("{}:{}:{}", e.component, e.verb, e.path)
        });
        dedup_by_key(&mut self.flows, |f| {
            format!(
                "{}:{}:{}",
                f.topic,
                f.publisher.as_deref().unwrap_or(""),
                f.subscriber.as_deref().unwrap_or("")
            )
        });
        dedup_by_key(&mut self.entities, |e| format!("{}:{}", e.component, e.name));
        dedup_by_key(&mut self.relationships, |r| {
            format!("{}:{}:{}", r.source, r.target, r.kind)
        });
        self
    }
}
