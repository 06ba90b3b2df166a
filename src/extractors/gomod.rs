//! Go `go.mod` manifests.
//!
//! The module path names the component; every `require` entry, single-line
//! or inside a block, becomes a dependency. Go only declares root modules,
//! so the group is the module path's host and the artifact the rest.

use super::collect_manifests;
use crate::extract::applicability::has_files;
use crate::extract::{ExtractError, Extractor, RunContext, SourceFile};
use crate::model::{Component, ComponentKind, Dependency, DependencyScope, Envelope, FactSet};

const GO_MOD_GLOB: &str = "**/go.mod";

pub struct GoModulesExtractor;

impl Extractor for GoModulesExtractor {
    fn id(&self) -> &str {
        "go-modules"
    }

    fn display_name(&self) -> &str {
        "Go Modules"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn groups(&self) -> &[&'static str] {
        &["go"]
    }

    fn applies_to(&self, ctx: &RunContext) -> bool {
        has_files(ctx, &[GO_MOD_GLOB])
    }

    fn extract(&self, ctx: &RunContext) -> Envelope {
        let files = ctx.find_files(GO_MOD_GLOB);
        collect_manifests(self.id(), &files, parse_go_mod)
    }
}

/// One `require` entry.
#[derive(Debug, PartialEq, Eq)]
struct Requirement {
    module: String,
    version: Option<String>,
    indirect: bool,
}

/// Parse `google.golang.org/grpc v1.60.0 // indirect`.
fn parse_require_line(line: &str) -> Option<Requirement> {
    let (requirement, comment) = match line.split_once("//") {
        Some((requirement, comment)) => (requirement, Some(comment)),
        None => (line, None),
    };
    let mut parts = requirement.split_whitespace();
    let module = parts.next()?.to_string();
    let version = parts.next().map(str::to_string);
    let indirect = comment
        .map(|c| c.split_whitespace().any(|w| w == "indirect"))
        .unwrap_or(false);
    Some(Requirement {
        module,
        version,
        indirect,
    })
}

fn parse_go_mod(file: &SourceFile, content: &str) -> Result<FactSet, ExtractError> {
    let mut module_path = String::new();
    let mut go_version = None;
    let mut requirements = Vec::new();
    let mut in_require_block = false;
    let mut in_other_block = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if in_require_block || in_other_block {
            if line == ")" {
                in_require_block = false;
                in_other_block = false;
            } else if in_require_block {
                requirements.extend(parse_require_line(line));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("module ") {
            module_path = rest.trim().trim_matches('"').to_string();
        } else if let Some(rest) = line.strip_prefix("go ") {
            go_version = Some(rest.trim().to_string());
        } else if line == "require (" {
            in_require_block = true;
        } else if let Some(rest) = line.strip_prefix("require ") {
            requirements.extend(parse_require_line(rest));
        } else if line.ends_with('(') {
            // replace ( / exclude ( / retract (
            in_other_block = true;
        }
    }

    if module_path.is_empty() {
        return Err(ExtractError::parse(&file.relative, "no module declaration found"));
    }

    let name = module_path.rsplit('/').next().unwrap_or(&module_path).to_string();
    let mut component = Component::new(&module_path, name, ComponentKind::Module)
        .with_technology("go")
        .with_location(&file.relative);
    if let Some(v) = go_version {
        component = component.with_metadata("go", v);
    }

    let mut facts = FactSet::new();
    facts.components.push(component);
    for req in requirements {
        let (group, artifact) = match req.module.split_once('/') {
            Some((host, rest)) => (host.to_string(), rest.to_string()),
            None => (String::new(), req.module.clone()),
        };
        facts.dependencies.push(Dependency {
            source_component: module_path.clone(),
            group,
            artifact,
            version: req.version,
            scope: DependencyScope::Compile,
            direct: !req.indirect,
        });
    }

    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(content: &str) -> Result<FactSet, ExtractError> {
        let file = SourceFile {
            path: PathBuf::from("go.mod"),
            relative: "go.mod".to_string(),
        };
        parse_go_mod(&file, content)
    }

    #[test]
    fn test_module_and_requirements() {
        let facts = parse(
            r#"module github.com/example/inventory

go 1.22

require github.com/segmentio/kafka-go v0.4.47

require (
	github.com/gin-gonic/gin v1.9.1
	golang.org/x/net v0.19.0 // indirect
)

replace (
	github.com/old/thing => ./local/thing
)
"#,
        )
        .unwrap();

        let component = &facts.components[0];
        assert_eq!(component.id, "github.com/example/inventory");
        assert_eq!(component.name, "inventory");
        assert_eq!(component.metadata.get("go").map(|s| s.as_str()), Some("1.22"));

        assert_eq!(facts.dependencies.len(), 3);
        let kafka = &facts.dependencies[0];
        assert_eq!(kafka.group, "github.com");
        assert_eq!(kafka.artifact, "segmentio/kafka-go");
        assert_eq!(kafka.version.as_deref(), Some("v0.4.47"));
        assert!(kafka.direct);
        assert!(facts.dependencies[1].direct);
        assert!(!facts.dependencies[2].direct);
        assert!(facts.dependencies.iter().all(|d| d.artifact != "old/thing"));
    }

    #[test]
    fn test_missing_module_is_error() {
        assert!(parse("go 1.21\n").is_err());
    }

    #[test]
    fn test_parse_require_line() {
        assert_eq!(
            parse_require_line("golang.org/x/net v0.19.0 // indirect"),
            Some(Requirement {
                module: "golang.org/x/net".to_string(),
                version: Some("v0.19.0".to_string()),
                indirect: true,
            })
        );
        assert_eq!(parse_require_line("   "), None);
    }
}
