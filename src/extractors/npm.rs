//! npm `package.json` manifests.

use serde_json::Value;

use super::collect_manifests;
use crate::extract::applicability::has_files;
use crate::extract::{ExtractError, Extractor, RunContext, SourceFile};
use crate::model::{Component, ComponentKind, Dependency, DependencyScope, Envelope, FactSet};

const PACKAGE_GLOB: &str = "**/package.json";

/// Dependency sections and the scope each one maps to.
const SECTIONS: &[(&str, DependencyScope)] = &[
    ("dependencies", DependencyScope::Compile),
    ("devDependencies", DependencyScope::Test),
    ("peerDependencies", DependencyScope::Provided),
];

pub struct NpmDependenciesExtractor;

impl Extractor for NpmDependenciesExtractor {
    fn id(&self) -> &str {
        "npm-dependencies"
    }

    fn display_name(&self) -> &str {
        "npm Dependencies"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn groups(&self) -> &[&'static str] {
        &["javascript"]
    }

    fn applies_to(&self, ctx: &RunContext) -> bool {
        has_files(ctx, &[PACKAGE_GLOB])
    }

    fn extract(&self, ctx: &RunContext) -> Envelope {
        let files = ctx.find_files(PACKAGE_GLOB);
        collect_manifests(self.id(), &files, parse_package_json)
    }
}

/// Directory holding the manifest, used when `name` is absent.
fn directory_name(relative: &str) -> String {
    relative
        .rsplit('/')
        .nth(1)
        .unwrap_or("root")
        .to_string()
}

fn parse_package_json(file: &SourceFile, content: &str) -> Result<FactSet, ExtractError> {
    let json: Value =
        serde_json::from_str(content).map_err(|e| ExtractError::parse(&file.relative, e))?;
    let Some(manifest) = json.as_object() else {
        return Err(ExtractError::parse(&file.relative, "expected a JSON object"));
    };

    let name = manifest
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| directory_name(&file.relative));

    let has_start = manifest
        .get("scripts")
        .and_then(|s| s.get("start"))
        .is_some();
    let kind = if has_start {
        ComponentKind::Service
    } else {
        ComponentKind::Library
    };

    let mut component = Component::new(&name, &name, kind)
        .with_technology("npm")
        .with_location(&file.relative);
    if let Some(version) = manifest.get("version").and_then(Value::as_str) {
        component = component.with_metadata("version", version);
    }
    if let Some(description) = manifest.get("description").and_then(Value::as_str) {
        component = component.with_description(description);
    }

    let mut facts = FactSet::new();
    facts.components.push(component);

    for (section, scope) in SECTIONS {
        let Some(entries) = manifest.get(*section).and_then(Value::as_object) else {
            continue;
        };
        // serde_json keeps keys sorted, so output order is stable.
        for (package, version) in entries {
            let (group, artifact) = split_scoped(package);
            facts.dependencies.push(Dependency {
                source_component: name.clone(),
                group,
                artifact,
                version: version.as_str().map(str::to_string),
                scope: *scope,
                direct: true,
            });
        }
    }

    Ok(facts)
}

/// `@nestjs/core` -> (`@nestjs`, `core`); unscoped names have an empty group.
fn split_scoped(package: &str) -> (String, String) {
    match package.split_once('/') {
        Some((scope, rest)) if scope.starts_with('@') => (scope.to_string(), rest.to_string()),
        _ => (String::new(), package.to_string()),
    }
}
