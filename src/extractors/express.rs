//! Express-style route registrations in JavaScript and TypeScript.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::{module_path, parallel, tiered_envelope};
use crate::analysis::query::{first_string_literal, run_query};
use crate::analysis::ParsedFile;
use crate::extract::applicability::has_files;
use crate::extract::{run_tiered, Extractor, RunContext, SourceFile, TieredSource};
use crate::model::{ApiEndpoint, Envelope};

const SCRIPT_GLOBS: &[&str] = &["**/*.js", "**/*.mjs", "**/*.cjs", "**/*.ts"];

const VERBS: &[&str] = &["get", "post", "put", "patch", "delete"];

const ROUTE_QUERY: &str = r#"
(call_expression
  function: (member_expression
    object: (identifier) @receiver
    property: (property_identifier) @verb)
  arguments: (arguments . [(string) (template_string)] @path)
) @call
"#;

lazy_static! {
    static ref ROUTER_ASSIGNMENT: Regex = Regex::new(
        r"(?:const|let|var)\s+(\w+)\s*=\s*(?:express\s*\(\s*\)|(?:express\s*\.\s*)?Router\s*\()"
    )
    .unwrap();
    static ref ROUTE_CALL: Regex = Regex::new(
        r#"\b(\w+)\s*\.\s*(get|post|put|patch|delete)\s*\(\s*(?:'([^']*)'|"([^"]*)"|`([^`]*)`)"#
    )
    .unwrap();
}

pub struct ExpressRoutesExtractor;

impl Extractor for ExpressRoutesExtractor {
    fn id(&self) -> &str {
        "express-routes"
    }

    fn display_name(&self) -> &str {
        "Express Routes"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn groups(&self) -> &[&'static str] {
        &["javascript"]
    }

    fn applies_to(&self, ctx: &RunContext) -> bool {
        has_files(ctx, SCRIPT_GLOBS)
    }

    fn extract(&self, ctx: &RunContext) -> Envelope {
        let files: Vec<SourceFile> = ctx
            .find_files_any(SCRIPT_GLOBS)
            .into_iter()
            .filter(|f| !f.relative.ends_with(".d.ts") && !f.relative.ends_with(".min.js"))
            .collect();
        let run = run_tiered(&ExpressSource, &files, parallel(ctx));
        tiered_envelope(self.id(), run, |endpoints, facts| facts.endpoints = endpoints)
    }
}

/// Identifiers that hold an app or router in this file.
fn router_names(text: &str) -> HashSet<String> {
    let mut names: HashSet<String> = ["app", "router", "api", "server"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    names.extend(ROUTER_ASSIGNMENT.captures_iter(text).map(|c| c[1].to_string()));
    names
}

fn is_router(name: &str, known: &HashSet<String>) -> bool {
    known.contains(name) || name.to_ascii_lowercase().ends_with("router")
}

struct ExpressSource;

impl TieredSource for ExpressSource {
    type Fact = ApiEndpoint;

    fn structural(&self, parsed: &ParsedFile, file: &SourceFile) -> anyhow::Result<Vec<ApiEndpoint>> {
        let Some(analyzer) = self.analyzer(file) else {
            return Ok(Vec::new());
        };
        let component = module_path(&file.relative);
        let routers = router_names(parsed.source_str());
        let matches = run_query(
            parsed,
            &analyzer.grammar(&file.path),
            ROUTE_QUERY,
            parsed.tree.root_node(),
        )?;

        let mut endpoints = Vec::new();
        for m in matches {
            let (Some(receiver), Some(verb), Some(path)) = (m.get("receiver"), m.get("verb"), m.get("path"))
            else {
                continue;
            };
            let verb = parsed.node_text(verb);
            if !VERBS.contains(&verb) || !is_router(parsed.node_text(receiver), &routers) {
                continue;
            }
            let Some(path) = first_string_literal(parsed.node_text(path)) else {
                continue;
            };

            // A named handler as the last argument, e.g. `controller.list`.
            let handler = path_handler(parsed, m.get("call"));
            let mut endpoint = ApiEndpoint::rest(&component, verb, path);
            if let Some(handler) = handler {
                endpoint = endpoint.with_description(format!("{}.{}", component, handler));
            }
            endpoints.push(endpoint);
        }
        Ok(endpoints)
    }

    fn fallback(&self, text: &str, file: &SourceFile) -> Vec<ApiEndpoint> {
        let component = module_path(&file.relative);
        let routers = router_names(text);
        ROUTE_CALL
            .captures_iter(text)
            .filter(|caps| is_router(&caps[1], &routers))
            .filter_map(|caps| {
                let path = caps.get(3).or_else(|| caps.get(4)).or_else(|| caps.get(5))?;
                Some(ApiEndpoint::rest(&component, &caps[2], path.as_str()))
            })
            .collect()
    }
}

fn path_handler(parsed: &ParsedFile, call: Option<tree_sitter::Node>) -> Option<String> {
    let args = call?.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let last = args.named_children(&mut cursor).last()?;
    match last.kind() {
        "identifier" | "member_expression" => Some(parsed.node_text(last).to_string()),
        _ => None,
    }
}
