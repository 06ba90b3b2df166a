//! Maven `pom.xml` manifests.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use roxmltree::{Document, Node};

use super::collect_manifests;
use crate::extract::applicability::has_files;
use crate::extract::{ExtractError, Extractor, RunContext, SourceFile};
use crate::model::{
    Component, ComponentKind, Dependency, DependencyScope, Envelope, FactSet, Relationship,
    RelationshipKind,
};

const POM_GLOB: &str = "**/pom.xml";

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\$\{([^}]+)\}").unwrap();
}

pub struct MavenDependenciesExtractor;

impl Extractor for MavenDependenciesExtractor {
    fn id(&self) -> &str {
        "maven-dependencies"
    }

    fn display_name(&self) -> &str {
        "Maven Dependencies"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn groups(&self) -> &[&'static str] {
        &["java"]
    }

    fn applies_to(&self, ctx: &RunContext) -> bool {
        has_files(ctx, &[POM_GLOB])
    }

    fn extract(&self, ctx: &RunContext) -> Envelope {
        let files = ctx.find_files(POM_GLOB);
        collect_manifests(self.id(), &files, parse_pom)
    }
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|c| c.has_tag_name(name))
}

fn child_text(node: Node, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Replace `${key}` with known properties; unknown keys stay verbatim.
fn resolve(value: &str, properties: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(value, |caps: &regex::Captures| {
            properties
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}

fn component_kind(packaging: &str) -> ComponentKind {
    match packaging {
        "pom" => ComponentKind::Module,
        "war" => ComponentKind::Service,
        _ => ComponentKind::Library,
    }
}

fn parse_pom(file: &SourceFile, content: &str) -> Result<FactSet, ExtractError> {
    let doc = Document::parse(content).map_err(|e| ExtractError::parse(&file.relative, e))?;
    let project = doc.root_element();
    if !project.has_tag_name("project") {
        return Err(ExtractError::parse(
            &file.relative,
            format!("root element is <{}>, expected <project>", project.tag_name().name()),
        ));
    }

    let parent = child(project, "parent");
    let parent_text = |name: &str| parent.and_then(|p| child_text(p, name));

    let artifact_id = child_text(project, "artifactId")
        .ok_or_else(|| ExtractError::parse(&file.relative, "missing <artifactId>"))?;
    let group_id = child_text(project, "groupId")
        .or_else(|| parent_text("groupId"))
        .unwrap_or_default();
    let version = child_text(project, "version").or_else(|| parent_text("version"));
    let packaging = child_text(project, "packaging").unwrap_or_else(|| "jar".to_string());

    let mut properties: HashMap<String, String> = HashMap::new();
    if let Some(props) = child(project, "properties") {
        for prop in props.children().filter(|n| n.is_element()) {
            if let Some(text) = prop.text() {
                properties.insert(prop.tag_name().name().to_string(), text.trim().to_string());
            }
        }
    }
    properties.insert("project.groupId".to_string(), group_id.clone());
    properties.insert("project.artifactId".to_string(), artifact_id.clone());
    if let Some(v) = &version {
        properties.insert("project.version".to_string(), v.clone());
        if let Some(pv) = parent_text("version") {
            properties.insert("project.parent.version".to_string(), pv);
        }
    }

    let group_id = resolve(&group_id, &properties);
    let version = version.map(|v| resolve(&v, &properties));
    let component_id = if group_id.is_empty() {
        artifact_id.clone()
    } else {
        format!("{}:{}", group_id, artifact_id)
    };

    let mut component = Component::new(&component_id, &artifact_id, component_kind(&packaging))
        .with_technology("maven")
        .with_location(&file.relative)
        .with_metadata("packaging", &packaging);
    if let Some(v) = &version {
        component = component.with_metadata("version", v);
    }
    if let Some(name) = child_text(project, "name") {
        component = component.with_description(resolve(&name, &properties));
    }

    let mut facts = FactSet::new();
    facts.components.push(component);

    // Only <project><dependencies>; <dependencyManagement> declares versions, not usage.
    if let Some(deps) = child(project, "dependencies") {
        for dep in deps.children().filter(|n| n.has_tag_name("dependency")) {
            let Some(artifact) = child_text(dep, "artifactId") else {
                continue;
            };
            facts.dependencies.push(Dependency {
                source_component: component_id.clone(),
                group: resolve(&child_text(dep, "groupId").unwrap_or_default(), &properties),
                artifact: resolve(&artifact, &properties),
                version: child_text(dep, "version").map(|v| resolve(&v, &properties)),
                scope: DependencyScope::parse(child_text(dep, "scope").as_deref()),
                direct: true,
            });
        }
    }

    if let Some(modules) = child(project, "modules") {
        for module in modules.children().filter(|n| n.has_tag_name("module")) {
            let Some(name) = module.text().map(str::trim).filter(|t| !t.is_empty()) else {
                continue;
            };
            let module_artifact = name.rsplit('/').next().unwrap_or(name);
            let target = if group_id.is_empty() {
                module_artifact.to_string()
            } else {
                format!("{}:{}", group_id, module_artifact)
            };
            facts.relationships.push(
                Relationship::new(&component_id, target, RelationshipKind::Contains)
                    .with_technology("maven"),
            );
        }
    }

    Ok(facts)
}
