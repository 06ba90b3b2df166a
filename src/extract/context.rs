//! Repository description and the per-extractor view of a run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{ConfigError, ProjectConfig};
use crate::model::{
    ApiEndpoint, Component, DataEntity, Dependency, Envelope, FactKind, MessageFlow,
    Relationship,
};

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "vendor",
    "__pycache__",
    "venv",
    ".venv",
];

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute (or root-joined) path used for reading.
    pub path: PathBuf,
    /// Path relative to the repository root with `/` separators.
    pub relative: String,
}

/// Everything an extraction run knows about the repository.
///
/// The file listing is walked once, lazily, and shared by all extractors.
pub struct Repository {
    root: PathBuf,
    source_roots: Vec<PathBuf>,
    settings: BTreeMap<String, String>,
    extractor_config: BTreeMap<String, serde_json::Map<String, Value>>,
    exclusions: GlobSet,
    files: OnceCell<Vec<SourceFile>>,
}

impl Repository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            source_roots: vec![root.clone()],
            root,
            settings: BTreeMap::new(),
            extractor_config: BTreeMap::new(),
            exclusions: GlobSet::empty(),
            files: OnceCell::new(),
        }
    }

    /// Build a repository view from a project configuration.
    pub fn from_config(root: impl Into<PathBuf>, config: &ProjectConfig) -> Result<Self, ConfigError> {
        let root = root.into();
        let roots: Vec<PathBuf> = if config.source_roots.is_empty() {
            vec![root.clone()]
        } else {
            config.source_roots.iter().map(|r| root.join(r)).collect()
        };

        let mut repo = Repository::new(root)
            .with_source_roots(roots)
            .with_exclusions(&config.excluded_paths)?;
        for (key, value) in config.setting_strings() {
            repo = repo.with_setting(key, value);
        }
        for (id, map) in &config.extractors.config {
            repo = repo.with_extractor_config(id, map.clone());
        }
        Ok(repo)
    }

    pub fn with_source_roots(mut self, roots: Vec<PathBuf>) -> Self {
        if !roots.is_empty() {
            self.source_roots = roots;
        }
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_extractor_config(
        mut self,
        extractor_id: impl Into<String>,
        config: serde_json::Map<String, Value>,
    ) -> Self {
        self.extractor_config.insert(extractor_id.into(), config);
        self
    }

    /// Exclude files whose repository-relative path matches any pattern.
    pub fn with_exclusions(mut self, patterns: &[String]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(build_glob(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?);
        }
        self.exclusions = builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: patterns.join(", "),
            message: e.to_string(),
        })?;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_roots(&self) -> &[PathBuf] {
        &self.source_roots
    }

    pub fn settings(&self) -> &BTreeMap<String, String> {
        &self.settings
    }

    /// All non-excluded files under the source roots, sorted by relative path.
    pub fn files(&self) -> &[SourceFile] {
        self.files.get_or_init(|| self.walk())
    }

    fn walk(&self) -> Vec<SourceFile> {
        let mut files: Vec<SourceFile> = Vec::new();

        for source_root in &self.source_roots {
            let walker = WalkDir::new(source_root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    if e.depth() == 0 || !e.file_type().is_dir() {
                        return true;
                    }
                    let name = e.file_name().to_string_lossy();
                    !(name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref()))
                });

            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        warn!("skipping unreadable entry under {}: {}", source_root.display(), e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let relative = relative_path(&self.root, path);
                if self.exclusions.is_match(&relative) {
                    debug!("excluded {}", relative);
                    continue;
                }
                files.push(SourceFile {
                    path: path.to_path_buf(),
                    relative,
                });
            }
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        files.dedup_by(|a, b| a.relative == b.relative);
        files
    }
}

fn build_glob(pattern: &str) -> Result<globset::Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// The view one extractor gets of a run in progress.
///
/// Only envelopes committed before this extractor started are visible.
pub struct RunContext<'a> {
    repo: &'a Repository,
    prior: &'a [Envelope],
    extractor_id: &'a str,
    reads: &'a [FactKind],
}

impl<'a> RunContext<'a> {
    pub fn new(
        repo: &'a Repository,
        prior: &'a [Envelope],
        extractor_id: &'a str,
        reads: &'a [FactKind],
    ) -> Self {
        Self {
            repo,
            prior,
            extractor_id,
            reads,
        }
    }

    pub fn repository(&self) -> &'a Repository {
        self.repo
    }

    pub fn root(&self) -> &'a Path {
        self.repo.root()
    }

    pub fn source_roots(&self) -> &'a [PathBuf] {
        self.repo.source_roots()
    }

    /// Files whose relative path matches `pattern`, sorted by path.
    ///
    /// An invalid pattern matches nothing.
    pub fn find_files(&self, pattern: &str) -> Vec<SourceFile> {
        match build_glob(pattern) {
            Ok(glob) => {
                let matcher = glob.compile_matcher();
                self.matching(&matcher).cloned().collect()
            }
            Err(e) => {
                warn!(extractor = self.extractor_id, "invalid glob {:?}: {}", pattern, e);
                Vec::new()
            }
        }
    }

    /// Files matching any of `patterns`, sorted by path and deduplicated.
    pub fn find_files_any(&self, patterns: &[&str]) -> Vec<SourceFile> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            match build_glob(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!(extractor = self.extractor_id, "invalid glob {:?}: {}", pattern, e),
            }
        }
        let Ok(set) = builder.build() else {
            return Vec::new();
        };
        self.repo
            .files()
            .iter()
            .filter(|f| set.is_match(&f.relative))
            .cloned()
            .collect()
    }

    /// Whether at least one file matches `pattern`.
    pub fn has_files(&self, pattern: &str) -> bool {
        build_glob(pattern)
            .map(|g| {
                let matcher = g.compile_matcher();
                let found = self.matching(&matcher).next().is_some();
                found
            })
            .unwrap_or(false)
    }

    fn matching<'m>(&self, matcher: &'m GlobMatcher) -> impl Iterator<Item = &'a SourceFile> + 'm
    where
        'a: 'm,
    {
        self.repo
            .files()
            .iter()
            .filter(move |f| matcher.is_match(&f.relative))
    }

    /// Global setting lookup.
    pub fn setting(&self, key: &str) -> Option<&'a str> {
        self.repo.settings.get(key).map(|s| s.as_str())
    }

    pub fn setting_or(&self, key: &str, default: &str) -> String {
        self.setting(key).unwrap_or(default).to_string()
    }

    /// Boolean setting; accepts true/false/yes/no/1/0.
    pub fn setting_bool(&self, key: &str, default: bool) -> bool {
        self.setting(key).and_then(parse_bool).unwrap_or(default)
    }

    /// Configuration value for the current extractor.
    pub fn config_value(&self, key: &str) -> Option<&'a Value> {
        self.repo
            .extractor_config
            .get(self.extractor_id)
            .and_then(|m| m.get(key))
    }

    pub fn config_bool(&self, key: &str, default: bool) -> bool {
        match self.config_value(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => parse_bool(s).unwrap_or(default),
            _ => default,
        }
    }

    /// A list of strings from configuration, or None when absent or malformed.
    pub fn config_str_list(&self, key: &str) -> Option<Vec<String>> {
        match self.config_value(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect(),
            ),
            Value::String(s) => Some(
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Envelope of an extractor that already ran.
    pub fn envelope(&self, extractor_id: &str) -> Option<&'a Envelope> {
        self.prior.iter().find(|e| e.extractor_id() == extractor_id)
    }

    /// All envelopes committed before this extractor, in run order.
    pub fn prior_envelopes(&self) -> &'a [Envelope] {
        self.prior
    }

    /// Facts from prior successful envelopes, limited to the declared reads.
    pub fn prior_facts(&self) -> PriorFacts<'a> {
        PriorFacts {
            envelopes: self.prior,
            reads: self.reads,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Read-only, kind-filtered view over prior envelopes.
///
/// Kinds the extractor did not declare in `Extractor::reads` come back empty.
#[derive(Clone, Copy)]
pub struct PriorFacts<'a> {
    envelopes: &'a [Envelope],
    reads: &'a [FactKind],
}

impl<'a> PriorFacts<'a> {
    fn visible(&self, kind: FactKind) -> impl Iterator<Item = &'a Envelope> {
        let allowed = self.reads.contains(&kind);
        self.envelopes
            .iter()
            .filter(move |e| allowed && e.is_success())
    }

    pub fn components(&self) -> impl Iterator<Item = &'a Component> {
        self.visible(FactKind::Component).flat_map(|e| e.components())
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &'a Dependency> {
        self.visible(FactKind::Dependency).flat_map(|e| e.dependencies())
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &'a ApiEndpoint> {
        self.visible(FactKind::ApiEndpoint).flat_map(|e| e.endpoints())
    }

    pub fn flows(&self) -> impl Iterator<Item = &'a MessageFlow> {
        self.visible(FactKind::MessageFlow).flat_map(|e| e.flows())
    }

    pub fn entities(&self) -> impl Iterator<Item = &'a DataEntity> {
        self.visible(FactKind::DataEntity).flat_map(|e| e.entities())
    }

    pub fn relationships(&self) -> impl Iterator<Item = &'a Relationship> {
        self.visible(FactKind::Relationship).flat_map(|e| e.relationships())
    }
}
