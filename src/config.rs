//! Project configuration for archfacts.
//!
//! A configuration file names the project, where its sources live, which
//! extractors run and how each one is tuned. Every section is optional.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file names, searched in order.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["archfacts.yaml", "archfacts.yml", ".archfacts.yaml"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("invalid setting {key:?}: {message}")]
    InvalidSetting { key: String, message: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectInfo,
    /// Source roots relative to the repository root. Empty means the root itself.
    #[serde(default)]
    pub source_roots: Vec<String>,
    /// Glob patterns for paths to exclude (e.g. "**/generated/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Global settings visible to every extractor. Scalars of any type.
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
    #[serde(default)]
    pub extractors: ExtractorSelection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// How the active extractor set is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Every registered extractor; applicability decides.
    Auto,
    /// Extractors belonging to the listed groups.
    Groups,
    /// Exactly the listed extractor ids.
    Explicit,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ExtractorSelection {
    /// Inferred from `enabled`/`groups` when absent.
    #[serde(default)]
    pub mode: Option<SelectionMode>,
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Per-extractor configuration keyed by extractor id.
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Map<String, Value>>,
}

impl ExtractorSelection {
    /// The explicit mode, or one inferred from which lists are populated.
    pub fn effective_mode(&self) -> SelectionMode {
        match self.mode {
            Some(mode) => mode,
            None if !self.enabled.is_empty() => SelectionMode::Explicit,
            None if !self.groups.is_empty() => SelectionMode::Groups,
            None => SelectionMode::Auto,
        }
    }
}

impl ProjectConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str(&content, &path.display().to_string())
    }

    pub fn parse_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
            path: origin.to_string(),
            source,
        })
    }

    /// Look for a default-named config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
    }

    /// Settings rendered as strings; non-scalar values are dropped.
    pub fn setting_strings(&self) -> BTreeMap<String, String> {
        self.settings
            .iter()
            .filter_map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((k.clone(), text))
            })
            .collect()
    }

    /// Returns whether per-file work may run on the thread pool (defaults to false).
    pub fn parallel(&self) -> bool {
        self.setting_strings()
            .get("parallel")
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    /// Project name, falling back to the given directory name.
    pub fn project_name(&self, root: &Path) -> String {
        if !self.project.name.is_empty() {
            return self.project.name.clone();
        }
        root.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string())
    }
}

/// Validate a configuration. Extractor ids and groups are checked later
/// against the registry.
pub fn validate(config: &ProjectConfig) -> Result<(), ConfigError> {
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
    }

    if let Some(budget) = config.setting_strings().get("extractor_budget_ms") {
        budget
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidSetting {
                key: "extractor_budget_ms".to_string(),
                message: e.to_string(),
            })?;
    }

    for root in &config.source_roots {
        if Path::new(root).is_absolute() {
            return Err(ConfigError::InvalidSetting {
                key: "source_roots".to_string(),
                message: format!("{} must be relative to the repository root", root),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
project:
  name: "shop"
  version: "1.0"
excluded_paths:
  - "**/generated/**"
settings:
  parallel: true
  extractor_budget_ms: 5000
extractors:
  groups: [java, messaging]
  config:
    rest-event-flow:
      detect_crud_patterns: false
      event_path_keywords: ["/events/"]
"#;
        let config = ProjectConfig::parse_str(yaml, "test").unwrap();
        assert_eq!(config.project.name, "shop");
        assert!(config.parallel());
        assert_eq!(
            config.setting_strings().get("extractor_budget_ms").map(|s| s.as_str()),
            Some("5000")
        );
        assert_eq!(config.extractors.effective_mode(), SelectionMode::Groups);
        let flow = config.extractors.config.get("rest-event-flow").unwrap();
        assert_eq!(flow.get("detect_crud_patterns"), Some(&Value::Bool(false)));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = ProjectConfig::parse_str("{}", "empty").unwrap();
        assert_eq!(config.extractors.effective_mode(), SelectionMode::Auto);
        assert!(!config.parallel());
        assert_eq!(config.project_name(Path::new("/repos/billing")), "billing");
    }

    #[test]
    fn test_explicit_mode_inferred_from_enabled() {
        let config =
            ProjectConfig::parse_str("extractors:\n  enabled: [maven-dependencies]\n", "t").unwrap();
        assert_eq!(config.extractors.effective_mode(), SelectionMode::Explicit);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ProjectConfig::default();
        config.excluded_paths.push("a/[".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidPattern { .. })));

        let mut config = ProjectConfig::default();
        config.settings.insert(
            "extractor_budget_ms".to_string(),
            Value::String("soon".to_string()),
        );
        assert!(matches!(validate(&config), Err(ConfigError::InvalidSetting { .. })));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = ProjectConfig::parse_str("project: [unclosed", "bad.yaml");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }
}
