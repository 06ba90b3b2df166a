//! Explicit extractor registration table.

use std::collections::BTreeSet;

use thiserror::Error;

use super::Extractor;
use crate::config::{ExtractorSelection, SelectionMode};

/// Startup integrity errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate extractor id: {0}")]
    DuplicateId(String),
    #[error("unknown extractor id: {0}")]
    UnknownExtractor(String),
    #[error("unknown extractor group: {0}")]
    UnknownGroup(String),
}

/// Collects extractors before validation.
#[derive(Default)]
pub struct RegistryBuilder {
    extractors: Vec<Box<dyn Extractor>>,
}

impl RegistryBuilder {
    pub fn register(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    /// Validate ids and freeze the table.
    pub fn build(self) -> Result<ExtractorRegistry, RegistryError> {
        let mut seen = BTreeSet::new();
        for extractor in &self.extractors {
            if !seen.insert(extractor.id().to_string()) {
                return Err(RegistryError::DuplicateId(extractor.id().to_string()));
            }
        }
        Ok(ExtractorRegistry {
            extractors: self.extractors,
        })
    }
}

/// Immutable set of extractors in registration order.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.id() == id)
            .map(|e| e.as_ref())
    }

    /// Extractors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Extractor> {
        self.extractors.iter().map(|e| e.as_ref())
    }

    /// Extractors in run order: priority ascending, registration order on ties.
    pub fn ordered(&self) -> Vec<&dyn Extractor> {
        let mut ordered: Vec<&dyn Extractor> = self.iter().collect();
        ordered.sort_by_key(|e| e.priority());
        ordered
    }

    /// Every group name any extractor declares.
    pub fn groups(&self) -> BTreeSet<&'static str> {
        self.extractors
            .iter()
            .flat_map(|e| e.groups().iter().copied())
            .collect()
    }

    /// Keep only the extractors the selection enables.
    pub fn select(self, selection: &ExtractorSelection) -> Result<Self, RegistryError> {
        match selection.effective_mode() {
            SelectionMode::Auto => Ok(self),
            SelectionMode::Explicit => {
                for id in &selection.enabled {
                    if self.get(id).is_none() {
                        return Err(RegistryError::UnknownExtractor(id.clone()));
                    }
                }
                Ok(self.retain(|e| selection.enabled.iter().any(|id| id == e.id())))
            }
            SelectionMode::Groups => {
                let known = self.groups();
                for group in &selection.groups {
                    if !known.contains(group.as_str()) {
                        return Err(RegistryError::UnknownGroup(group.clone()));
                    }
                }
                Ok(self.retain(|e| {
                    e.groups()
                        .iter()
                        .any(|g| selection.groups.iter().any(|s| s.as_str() == *g))
                }))
            }
        }
    }

    fn retain(mut self, keep: impl Fn(&dyn Extractor) -> bool) -> Self {
        self.extractors.retain(|e| keep(e.as_ref()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::RunContext;
    use crate::model::Envelope;

    struct Fixed {
        id: &'static str,
        priority: i32,
        groups: &'static [&'static str],
    }

    impl Extractor for Fixed {
        fn id(&self) -> &str {
            self.id
        }
        fn display_name(&self) -> &str {
            self.id
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn groups(&self) -> &[&'static str] {
            self.groups
        }
        fn applies_to(&self, _ctx: &RunContext) -> bool {
            true
        }
        fn extract(&self, _ctx: &RunContext) -> Envelope {
            Envelope::empty(self.id)
        }
    }

    fn fixed(id: &'static str, priority: i32, groups: &'static [&'static str]) -> Fixed {
        Fixed { id, priority, groups }
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let result = ExtractorRegistry::builder()
            .register(fixed("a", 1, &[]))
            .register(fixed("a", 2, &[]))
            .build();
        assert_eq!(result.err(), Some(RegistryError::DuplicateId("a".to_string())));
    }

    #[test]
    fn test_ordered_is_stable_on_ties() {
        let registry = ExtractorRegistry::builder()
            .register(fixed("late", 100, &[]))
            .register(fixed("first-tie", 10, &[]))
            .register(fixed("early", 1, &[]))
            .register(fixed("second-tie", 10, &[]))
            .build()
            .unwrap();
        let ids: Vec<_> = registry.ordered().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["early", "first-tie", "second-tie", "late"]);
    }

    #[test]
    fn test_select_by_group_and_explicit() {
        let build = || {
            ExtractorRegistry::builder()
                .register(fixed("maven", 10, &["java"]))
                .register(fixed("express", 50, &["javascript"]))
                .build()
                .unwrap()
        };

        let groups = ExtractorSelection {
            groups: vec!["java".to_string()],
            ..Default::default()
        };
        let selected = build().select(&groups).unwrap();
        assert_eq!(selected.len(), 1);
        assert!(selected.get("maven").is_some());

        let explicit = ExtractorSelection {
            enabled: vec!["express".to_string()],
            ..Default::default()
        };
        let selected = build().select(&explicit).unwrap();
        assert_eq!(selected.iter().map(|e| e.id()).collect::<Vec<_>>(), vec!["express"]);

        let unknown = ExtractorSelection {
            enabled: vec!["nope".to_string()],
            ..Default::default()
        };
        assert_eq!(
            build().select(&unknown).err(),
            Some(RegistryError::UnknownExtractor("nope".to_string()))
        );

        let bad_group = ExtractorSelection {
            groups: vec!["cobol".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            build().select(&bad_group),
            Err(RegistryError::UnknownGroup(_))
        ));
    }
}
