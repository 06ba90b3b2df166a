//! JPA `@Entity` classes.

use lazy_static::lazy_static;
use regex::Regex;

use super::{parallel, tiered_envelope};
use crate::analysis::query::children_of_kind;
use crate::analysis::{annotations, find_annotation, has_modifier, java_analyzer, members, ParsedFile};
use crate::extract::applicability::has_files;
use crate::extract::{run_tiered, Extractor, RunContext, SourceFile, TieredSource};
use crate::model::{DataEntity, Envelope, Field};

const JAVA_GLOB: &str = "**/*.java";

const PRIMARY_KEY_ANNOTATIONS: &[&str] = &["Id", "EmbeddedId"];

const ASSOCIATION_ANNOTATIONS: &[&str] = &["OneToOne", "OneToMany", "ManyToOne", "ManyToMany"];

lazy_static! {
    static ref PACKAGE: Regex = Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").unwrap();
    static ref ENTITY_CLASS: Regex =
        Regex::new(r"@Entity\b[\s\S]*?\bclass\s+(\w+)").unwrap();
    static ref TABLE_NAME: Regex =
        Regex::new(r#"@Table\s*\([^)]*\bname\s*=\s*"([^"]+)""#).unwrap();
    static ref FIELD: Regex = Regex::new(
        r"((?:@\w+(?:\s*\([^)]*\))?\s*)*)(?:private|protected|public)\s+((?:static\s+|final\s+|transient\s+)*)([\w<>,.?\[\] ]+?)\s+(\w+)\s*(?:=[^;]*)?;"
    )
    .unwrap();
    static ref NOT_NULLABLE: Regex = Regex::new(r"nullable\s*=\s*false").unwrap();
}

pub struct JpaEntitiesExtractor;

impl Extractor for JpaEntitiesExtractor {
    fn id(&self) -> &str {
        "jpa-entities"
    }

    fn display_name(&self) -> &str {
        "JPA Entities"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn groups(&self) -> &[&'static str] {
        &["java", "schema"]
    }

    fn applies_to(&self, ctx: &RunContext) -> bool {
        has_files(ctx, &[JAVA_GLOB])
    }

    fn extract(&self, ctx: &RunContext) -> Envelope {
        let files = ctx.find_files(JAVA_GLOB);
        let run = run_tiered(&JpaSource, &files, parallel(ctx));
        tiered_envelope(self.id(), run, |entities, facts| facts.entities = entities)
    }
}

struct JpaSource;

impl TieredSource for JpaSource {
    type Fact = DataEntity;

    fn structural(&self, parsed: &ParsedFile, _file: &SourceFile) -> anyhow::Result<Vec<DataEntity>> {
        let mut entities = Vec::new();

        for class in java_analyzer().classes(parsed)? {
            let class_annotations = annotations(parsed, class.node);
            if find_annotation(&class_annotations, "Entity").is_none() {
                continue;
            }
            let table = find_annotation(&class_annotations, "Table")
                .and_then(|t| t.strings(&["name"]).into_iter().next())
                .unwrap_or_else(|| class.name.clone());

            let mut fields = Vec::new();
            let mut primary_key = None;
            for decl in members(class.node, "field_declaration") {
                if has_modifier(parsed, decl, "static") {
                    continue;
                }
                let field_annotations = annotations(parsed, decl);
                if find_annotation(&field_annotations, "Transient").is_some() {
                    continue;
                }
                let is_key = field_annotations
                    .iter()
                    .any(|a| PRIMARY_KEY_ANNOTATIONS.contains(&a.name.as_str()));
                let not_null = find_annotation(&field_annotations, "Column")
                    .and_then(|c| c.argument("nullable"))
                    .map(|v| v.trim() == "false")
                    .unwrap_or(false);
                let note = field_annotations
                    .iter()
                    .find(|a| ASSOCIATION_ANNOTATIONS.contains(&a.name.as_str()))
                    .map(|a| format!("@{}", a.name));
                let type_name = decl
                    .child_by_field_name("type")
                    .map(|t| parsed.node_text(t).to_string())
                    .unwrap_or_default();

                for declarator in children_of_kind(decl, "variable_declarator") {
                    let Some(name) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    let name = parsed.node_text(name).to_string();
                    if is_key && primary_key.is_none() {
                        primary_key = Some(name.clone());
                    }
                    fields.push(Field {
                        name,
                        type_name: type_name.clone(),
                        nullable: !(is_key || not_null),
                        note: note.clone(),
                    });
                }
            }

            entities.push(DataEntity {
                component: class.qualified_name.clone(),
                name: table,
                kind: "table".to_string(),
                fields,
                primary_key,
                description: Some(format!("JPA entity {}", class.qualified_name)),
            });
        }

        Ok(entities)
    }

    fn fallback(&self, text: &str, _file: &SourceFile) -> Vec<DataEntity> {
        let Some(class) = ENTITY_CLASS.captures(text) else {
            return Vec::new();
        };
        let class_name = class[1].to_string();
        let body_start = class.get(0).map(|m| m.end()).unwrap_or(0);
        let qualified = match PACKAGE.captures(text) {
            Some(pkg) => format!("{}.{}", &pkg[1], class_name),
            None => class_name.clone(),
        };
        let table = TABLE_NAME
            .captures(&text[..body_start])
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| class_name.clone());

        let mut fields = Vec::new();
        let mut primary_key = None;
        for caps in FIELD.captures_iter(&text[body_start..]) {
            let annotations = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let modifiers = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            if modifiers.contains("static") || annotations.contains("@Transient") {
                continue;
            }
            let is_key = annotations.contains("@Id") || annotations.contains("@EmbeddedId");
            let name = caps[4].to_string();
            if is_key && primary_key.is_none() {
                primary_key = Some(name.clone());
            }
            fields.push(Field {
                name,
                type_name: caps[3].trim().to_string(),
                nullable: !(is_key || NOT_NULLABLE.is_match(annotations)),
                note: ASSOCIATION_ANNOTATIONS
                    .iter()
                    .find(|a| annotations.contains(&format!("@{}", a)))
                    .map(|a| format!("@{}", a)),
            });
        }

        vec![DataEntity {
            component: qualified.clone(),
            name: table,
            kind: "table".to_string(),
            fields,
            primary_key,
            description: Some(format!("JPA entity {}", qualified)),
        }]
    }
}
