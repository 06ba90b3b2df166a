//! FastAPI and Flask route decorators.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use tree_sitter::Node;

use super::{combine_paths, module_path, parallel, tiered_envelope};
use crate::analysis::query::{children_of_kind, run_query, string_literals};
use crate::analysis::ParsedFile;
use crate::extract::applicability::has_files;
use crate::extract::{run_tiered, Extractor, RunContext, SourceFile, TieredSource};
use crate::model::{ApiEndpoint, Envelope};

const PYTHON_GLOB: &str = "**/*.py";

const DECORATED_QUERY: &str = r#"
(decorated_definition
  definition: (function_definition
    name: (identifier) @name
    parameters: (parameters) @params)
) @def
"#;

/// Annotated parameter types that never carry the request body.
const NON_BODY_TYPES: &[&str] = &[
    "Request",
    "Response",
    "Session",
    "AsyncSession",
    "BackgroundTasks",
    "UploadFile",
    "WebSocket",
    "HTTPAuthorizationCredentials",
];

lazy_static! {
    static ref VERB_DECORATOR: Regex = Regex::new(
        r#"^@\s*(\w+)\.(get|post|put|patch|delete|head|options)\(\s*[rbuf]?["']([^"']*)["']"#
    )
    .unwrap();
    static ref ROUTE_DECORATOR: Regex =
        Regex::new(r#"^@\s*(\w+)\.route\(\s*[rbuf]?["']([^"']*)["']"#).unwrap();
    static ref METHODS_ARG: Regex = Regex::new(r"methods\s*=\s*[\[(]([^\])]*)[\])]").unwrap();
    static ref RESPONSE_MODEL: Regex =
        Regex::new(r"response_model\s*=\s*([\w.\[\], ]+?)\s*[,)]").unwrap();
    static ref ROUTER: Regex =
        Regex::new(r"(?m)^(\w+)\s*=\s*(?:\w+\.)?(?:APIRouter|Blueprint)\(([^)]*)\)").unwrap();
    static ref PREFIX_ARG: Regex =
        Regex::new(r#"(?:url_)?prefix\s*=\s*["']([^"']*)["']"#).unwrap();
    static ref DECORATED_DEF: Regex = Regex::new(
        r"(?m)((?:^[ \t]*@.*\n)+)[ \t]*(?:async\s+)?def\s+(\w+)\s*\(([^)]*)\)"
    )
    .unwrap();
}

pub struct FastApiRoutesExtractor;

impl Extractor for FastApiRoutesExtractor {
    fn id(&self) -> &str {
        "fastapi-routes"
    }

    fn display_name(&self) -> &str {
        "FastAPI / Flask Routes"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn groups(&self) -> &[&'static str] {
        &["python"]
    }

    fn applies_to(&self, ctx: &RunContext) -> bool {
        has_files(ctx, &[PYTHON_GLOB])
    }

    fn extract(&self, ctx: &RunContext) -> Envelope {
        let files = ctx.find_files(PYTHON_GLOB);
        let run = run_tiered(&RouteSource, &files, parallel(ctx));
        tiered_envelope(self.id(), run, |endpoints, facts| facts.endpoints = endpoints)
    }
}

/// A route decorator: router variable, verbs and path.
#[derive(Debug, PartialEq)]
struct Route {
    router: String,
    verbs: Vec<String>,
    path: String,
    response_model: Option<String>,
}

fn parse_decorator(text: &str) -> Option<Route> {
    let text = text.trim();
    let response_model = RESPONSE_MODEL.captures(text).map(|c| c[1].trim().to_string());

    if let Some(caps) = VERB_DECORATOR.captures(text) {
        return Some(Route {
            router: caps[1].to_string(),
            verbs: vec![caps[2].to_uppercase()],
            path: caps[3].to_string(),
            response_model,
        });
    }

    let caps = ROUTE_DECORATOR.captures(text)?;
    let mut verbs: Vec<String> = METHODS_ARG
        .captures(text)
        .map(|m| string_literals(&m[1]).iter().map(|v| v.to_uppercase()).collect())
        .unwrap_or_default();
    if verbs.is_empty() {
        verbs.push("GET".to_string());
    }
    Some(Route {
        router: caps[1].to_string(),
        verbs,
        path: caps[2].to_string(),
        response_model,
    })
}

/// `prefix=` of every `APIRouter(...)` / `Blueprint(...)` assignment.
fn router_prefixes(text: &str) -> HashMap<String, String> {
    ROUTER
        .captures_iter(text)
        .filter_map(|caps| {
            let prefix = PREFIX_ARG.captures(&caps[2])?;
            Some((caps[1].to_string(), prefix[1].to_string()))
        })
        .collect()
}

fn is_body_type(type_name: &str) -> bool {
    type_name.chars().next().map(char::is_uppercase).unwrap_or(false)
        && !type_name.contains('[')
        && !NON_BODY_TYPES.contains(&type_name)
}

/// First `name: Model` parameter without a default.
fn request_model_from_signature(params: &str) -> Option<String> {
    params.split(',').find_map(|param| {
        if param.contains('=') {
            return None;
        }
        let (_, type_name) = param.split_once(':')?;
        let type_name = type_name.trim();
        is_body_type(type_name).then(|| type_name.to_string())
    })
}

fn request_model(parsed: &ParsedFile, params: Node) -> Option<String> {
    children_of_kind(params, "typed_parameter")
        .into_iter()
        .filter_map(|p| p.child_by_field_name("type"))
        .map(|t| parsed.node_text(t).trim().to_string())
        .find(|t| is_body_type(t))
}

fn endpoints_for(
    component: &str,
    function: &str,
    route: Route,
    prefixes: &HashMap<String, String>,
    request: Option<String>,
) -> Vec<ApiEndpoint> {
    let prefix = prefixes.get(&route.router).map(String::as_str).unwrap_or("");
    let path = combine_paths(prefix, &route.path);
    route
        .verbs
        .iter()
        .map(|verb| {
            ApiEndpoint::rest(component, verb, &path)
                .with_description(format!("{}.{}", component, function))
                .with_request_schema(request.clone())
                .with_response_schema(route.response_model.clone())
        })
        .collect()
}

struct RouteSource;

impl TieredSource for RouteSource {
    type Fact = ApiEndpoint;

    fn structural(&self, parsed: &ParsedFile, file: &SourceFile) -> anyhow::Result<Vec<ApiEndpoint>> {
        let Some(analyzer) = self.analyzer(file) else {
            return Ok(Vec::new());
        };
        let component = module_path(&file.relative);
        let prefixes = router_prefixes(parsed.source_str());
        let matches = run_query(
            parsed,
            &analyzer.grammar(&file.path),
            DECORATED_QUERY,
            parsed.tree.root_node(),
        )?;

        let mut endpoints = Vec::new();
        for m in matches {
            let (Some(def), Some(name), Some(params)) = (m.get("def"), m.get("name"), m.get("params"))
            else {
                continue;
            };
            let function = parsed.node_text(name);
            let request = request_model(parsed, params);
            for decorator in children_of_kind(def, "decorator") {
                if let Some(route) = parse_decorator(parsed.node_text(decorator)) {
                    endpoints.extend(endpoints_for(
                        &component,
                        function,
                        route,
                        &prefixes,
                        request.clone(),
                    ));
                }
            }
        }
        Ok(endpoints)
    }

    fn fallback(&self, text: &str, file: &SourceFile) -> Vec<ApiEndpoint> {
        let component = module_path(&file.relative);
        let prefixes = router_prefixes(text);
        let mut endpoints = Vec::new();

        for caps in DECORATED_DEF.captures_iter(text) {
            let function = &caps[2];
            let request = request_model_from_signature(&caps[3]);
            for line in caps[1].lines() {
                if let Some(route) = parse_decorator(line) {
                    endpoints.extend(endpoints_for(
                        &component,
                        function,
                        route,
                        &prefixes,
                        request.clone(),
                    ));
                }
            }
        }
        endpoints
    }
}
