//! Spring MVC controllers.

use lazy_static::lazy_static;
use regex::Regex;
use tree_sitter::Node;

use super::{combine_paths, parallel, tiered_envelope};
use crate::analysis::query::{children_of_kind, string_literals};
use crate::analysis::{annotations, find_annotation, java_analyzer, members, Annotation, ParsedFile};
use crate::extract::applicability::has_files;
use crate::extract::{run_tiered, Extractor, RunContext, SourceFile, TieredSource};
use crate::model::{ApiEndpoint, Envelope};

const JAVA_GLOB: &str = "**/*.java";

const CONTROLLER_ANNOTATIONS: &[&str] = &["RestController", "Controller"];

/// Shortcut mapping annotations and the verb they imply.
const VERB_MAPPINGS: &[(&str, &str)] = &[
    ("GetMapping", "GET"),
    ("PostMapping", "POST"),
    ("PutMapping", "PUT"),
    ("PatchMapping", "PATCH"),
    ("DeleteMapping", "DELETE"),
];

lazy_static! {
    static ref REQUEST_METHOD: Regex = Regex::new(r"RequestMethod\.(\w+)").unwrap();
    static ref PACKAGE: Regex = Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").unwrap();
    static ref CLASS: Regex = Regex::new(r"\bclass\s+(\w+)").unwrap();
    static ref MAPPING: Regex = Regex::new(
        r"@(Get|Post|Put|Patch|Delete|Request)Mapping\s*(?:\(([^)]*)\))?\s*(?:@\w+(?:\([^)]*\))?\s*)*(?:(?:public|protected|private|static|final)\s+)*([\w<>\[\],.? ]+?)\s+(\w+)\s*\("
    )
    .unwrap();
    static ref CLASS_MAPPING: Regex =
        Regex::new(r"@RequestMapping\s*\(([^)]*)\)").unwrap();
}

pub struct SpringRestApiExtractor;

impl Extractor for SpringRestApiExtractor {
    fn id(&self) -> &str {
        "spring-rest-api"
    }

    fn display_name(&self) -> &str {
        "Spring REST API"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn groups(&self) -> &[&'static str] {
        &["java"]
    }

    fn applies_to(&self, ctx: &RunContext) -> bool {
        has_files(ctx, &[JAVA_GLOB])
    }

    fn extract(&self, ctx: &RunContext) -> Envelope {
        let files = ctx.find_files(JAVA_GLOB);
        let run = run_tiered(&SpringSource, &files, parallel(ctx));
        tiered_envelope(self.id(), run, |endpoints, facts| facts.endpoints = endpoints)
    }
}

struct SpringSource;

impl TieredSource for SpringSource {
    type Fact = ApiEndpoint;

    fn structural(&self, parsed: &ParsedFile, _file: &SourceFile) -> anyhow::Result<Vec<ApiEndpoint>> {
        let mut endpoints = Vec::new();

        for class in java_analyzer().classes(parsed)? {
            let class_annotations = annotations(parsed, class.node);
            if !class_annotations
                .iter()
                .any(|a| CONTROLLER_ANNOTATIONS.contains(&a.name.as_str()))
            {
                continue;
            }
            let base = find_annotation(&class_annotations, "RequestMapping")
                .and_then(|a| a.strings(&["value", "path"]).into_iter().next())
                .unwrap_or_default();

            for method in members(class.node, "method_declaration") {
                let Some((verb, paths)) = method_mapping(&annotations(parsed, method)) else {
                    continue;
                };
                let name = method
                    .child_by_field_name("name")
                    .map(|n| parsed.node_text(n))
                    .unwrap_or_default();
                let response = method
                    .child_by_field_name("type")
                    .map(|t| parsed.node_text(t).to_string())
                    .filter(|t| t != "void");
                let request = request_body_type(parsed, method);

                for path in paths {
                    endpoints.push(
                        ApiEndpoint::rest(&class.qualified_name, verb, combine_paths(&base, &path))
                            .with_description(format!("{}.{}", class.qualified_name, name))
                            .with_request_schema(request.clone())
                            .with_response_schema(response.clone()),
                    );
                }
            }
        }

        Ok(endpoints)
    }

    fn fallback(&self, text: &str, _file: &SourceFile) -> Vec<ApiEndpoint> {
        if !CONTROLLER_ANNOTATIONS
            .iter()
            .any(|a| text.contains(&format!("@{}", a)))
        {
            return Vec::new();
        }
        let Some(class) = CLASS.captures(text) else {
            return Vec::new();
        };
        let class_start = class.get(0).map(|m| m.start()).unwrap_or(0);
        let qualified = match PACKAGE.captures(text) {
            Some(pkg) => format!("{}.{}", &pkg[1], &class[1]),
            None => class[1].to_string(),
        };
        let base = CLASS_MAPPING
            .captures(&text[..class_start])
            .and_then(|c| string_literals(&c[1]).into_iter().next())
            .unwrap_or_default();

        let mut endpoints = Vec::new();
        for caps in MAPPING.captures_iter(&text[class_start..]) {
            let args = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let verb = match &caps[1] {
                "Request" => request_method(args),
                shortcut => shortcut.to_uppercase(),
            };
            let mut paths = string_literals(args);
            if paths.is_empty() {
                paths.push(String::new());
            }
            let response = Some(caps[3].trim().to_string()).filter(|t| t != "void");
            for path in paths {
                endpoints.push(
                    ApiEndpoint::rest(&qualified, &verb, combine_paths(&base, &path))
                        .with_description(format!("{}.{}", qualified, &caps[4]))
                        .with_response_schema(response.clone()),
                );
            }
        }
        endpoints
    }
}

/// Verb and paths for a handler method, if it carries a mapping annotation.
fn method_mapping(annotations: &[Annotation]) -> Option<(&'static str, Vec<String>)> {
    annotations.iter().find_map(|a| {
        let verb = match VERB_MAPPINGS.iter().find(|(name, _)| *name == a.name) {
            Some((_, verb)) => *verb,
            None if a.name == "RequestMapping" => {
                static_verb(&request_method(a.argument("method").unwrap_or("")))
            }
            None => return None,
        };
        let mut paths = a.strings(&["value", "path"]);
        if paths.is_empty() {
            paths.push(String::new());
        }
        Some((verb, paths))
    })
}

/// `RequestMethod.POST` -> "POST"; no method means GET.
fn request_method(args: &str) -> String {
    REQUEST_METHOD
        .captures(args)
        .map(|c| c[1].to_uppercase())
        .unwrap_or_else(|| "GET".to_string())
}

fn static_verb(verb: &str) -> &'static str {
    match verb {
        "POST" => "POST",
        "PUT" => "PUT",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        _ => "GET",
    }
}

/// Declared type of the `@RequestBody` parameter.
fn request_body_type(parsed: &ParsedFile, method: Node) -> Option<String> {
    let params = method.child_by_field_name("parameters")?;
    children_of_kind(params, "formal_parameter")
        .into_iter()
        .find(|p| find_annotation(&annotations(parsed, *p), "RequestBody").is_some())
        .and_then(|p| p.child_by_field_name("type"))
        .map(|t| parsed.node_text(t).to_string())
}
