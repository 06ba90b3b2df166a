//! The result envelope every extractor returns.

use serde::{Deserialize, Serialize};

use super::{
    ApiEndpoint, Component, DataEntity, Dependency, FactSet, MessageFlow, Relationship,
    ScanStatistics,
};

/// Outcome of one extractor run.
///
/// Fields are private so the only way to build an envelope is through the
/// constructors, which guarantee that a failed envelope carries no facts.
/// Deserialization enforces the same rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct Envelope {
    extractor_id: String,
    success: bool,
    facts: FactSet,
    warnings: Vec<String>,
    errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    statistics: Option<ScanStatistics>,
}

/// Wire form of an envelope before the invariant is checked.
#[derive(Deserialize)]
struct RawEnvelope {
    extractor_id: String,
    success: bool,
    #[serde(default)]
    facts: FactSet,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    statistics: Option<ScanStatistics>,
}

impl TryFrom<RawEnvelope> for Envelope {
    type Error = String;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        if !raw.success && !raw.facts.is_empty() {
            return Err(format!(
                "failed envelope from {} carries {} facts",
                raw.extractor_id,
                raw.facts.len()
            ));
        }
        Ok(Self {
            extractor_id: raw.extractor_id,
            success: raw.success,
            facts: raw.facts,
            warnings: raw.warnings,
            errors: raw.errors,
            statistics: raw.statistics,
        })
    }
}

impl Envelope {
    /// Successful run that found nothing.
    pub fn empty(extractor_id: impl Into<String>) -> Self {
        Self::success(extractor_id, FactSet::default())
    }

    /// Successful run with the given facts.
    pub fn success(extractor_id: impl Into<String>, facts: FactSet) -> Self {
        Self {
            extractor_id: extractor_id.into(),
            success: true,
            facts,
            warnings: Vec::new(),
            errors: Vec::new(),
            statistics: None,
        }
    }

    /// Failed run. All fact lists are empty.
    pub fn failed(extractor_id: impl Into<String>, errors: Vec<String>) -> Self {
        let errors = if errors.is_empty() {
            vec!["extraction failed".to_string()]
        } else {
            errors
        };
        Self {
            extractor_id: extractor_id.into(),
            success: false,
            facts: FactSet::default(),
            warnings: Vec::new(),
            errors,
            statistics: None,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_statistics(mut self, statistics: ScanStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub(crate) fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn extractor_id(&self) -> &str {
        &self.extractor_id
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn facts(&self) -> &FactSet {
        &self.facts
    }

    pub fn components(&self) -> &[Component] {
        &self.facts.components
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.facts.dependencies
    }

    pub fn endpoints(&self) -> &[ApiEndpoint] {
        &self.facts.endpoints
    }

    pub fn flows(&self) -> &[MessageFlow] {
        &self.facts.flows
    }

    pub fn entities(&self) -> &[DataEntity] {
        &self.facts.entities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.facts.relationships
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn statistics(&self) -> Option<&ScanStatistics> {
        self.statistics.as_ref()
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// True when the run succeeded and produced at least one fact.
    pub fn has_findings(&self) -> bool {
        self.success && !self.facts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiEndpoint, FactSet};

    #[test]
    fn test_failed_envelope_has_no_facts() {
        let env = Envelope::failed("x", vec!["boom".to_string()]);
        assert!(!env.is_success());
        assert!(env.facts().is_empty());
        assert_eq!(env.errors(), &["boom".to_string()]);
        assert!(!env.has_findings());
    }

    #[test]
    fn test_failed_without_message_still_reports_error() {
        let env = Envelope::failed("x", Vec::new());
        assert_eq!(env.errors().len(), 1);
    }

    #[test]
    fn test_success_envelope() {
        let mut facts = FactSet::new();
        facts.endpoints.push(ApiEndpoint::rest("svc", "GET", "/a"));
        let env = Envelope::success("x", facts).with_warning("skipped b.json");
        assert!(env.is_success());
        assert!(env.has_findings());
        assert_eq!(env.endpoints().len(), 1);
        assert_eq!(env.warnings().len(), 1);
        assert!(env.errors().is_empty());
    }

    #[test]
    fn test_deserialize_checks_failed_envelope() {
        let failed = Envelope::failed("x", vec!["boom".to_string()]);
        let json = serde_json::to_string(&failed).unwrap();
        assert_eq!(serde_json::from_str::<Envelope>(&json).unwrap(), failed);

        let mut facts = FactSet::new();
        facts.endpoints.push(ApiEndpoint::rest("svc", "GET", "/a"));
        let mut value = serde_json::to_value(Envelope::success("x", facts)).unwrap();
        value["success"] = serde_json::Value::Bool(false);
        let err = serde_json::from_value::<Envelope>(value).unwrap_err();
        assert!(err.to_string().contains("carries 1 facts"));
    }

    #[test]
    fn test_empty_envelope() {
        let env = Envelope::empty("x");
        assert!(env.is_success());
        assert_eq!(env.fact_count(), 0);
        assert!(env.statistics().is_none());
    }
}
