//! Event flows inferred from REST endpoints.
//!
//! Runs after every endpoint extractor and reads their `ApiEndpoint` facts.
//! An endpoint is treated as an event sink when any one heuristic fires:
//!
//! - its path contains an event keyword (`/events/`, `/webhooks/`, ...)
//! - it is a POST whose path has a past-participle segment (`/order-created`)
//! - its request or response schema ends in an event suffix (`...Event`)
//!
//! Independently, endpoints sharing a base path with both reads and writes
//! are reported as a CRUD flow on that resource.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tracing::{debug, info};

use crate::extract::{Extractor, RunContext};
use crate::model::{ApiEndpoint, Envelope, FactKind, FactSet, MessageFlow};

pub const EVENT_PATH_KEYWORDS: &[&str] = &[
    "/events/",
    "/domain-events/",
    "/webhooks/",
    "/notifications/",
    "-events/",
    "/event/",
];

pub const PAST_TENSE_VERBS: &[&str] = &[
    "created",
    "updated",
    "deleted",
    "removed",
    "completed",
    "processed",
    "confirmed",
    "approved",
    "rejected",
    "cancelled",
    "failed",
    "succeeded",
    "registered",
    "activated",
    "deactivated",
    "suspended",
    "reserved",
    "released",
    "allocated",
    "assigned",
];

pub const EVENT_SCHEMA_SUFFIXES: &[&str] = &["Event", "Notification", "Message", "Webhook"];

const REST_EVENT_BROKER: &str = "rest-event";
const CRUD_BROKER: &str = "restful-crud";

lazy_static! {
    static ref BRACED_VARIABLE: Regex = Regex::new(r"/\{[^}]+\}").unwrap();
    static ref COLON_VARIABLE: Regex = Regex::new(r"/:[^/]+").unwrap();
    static ref VERSION_SEGMENT: Regex = Regex::new(r"^v\d+$").unwrap();
    static ref DEFAULT_PAST_TENSE: Regex = past_tense_regex(PAST_TENSE_VERBS).unwrap();
}

/// Invalid correlation rules in the extractor's configuration.
#[derive(Error, Debug)]
pub enum HeuristicsError {
    #[error("{0} contains an empty entry")]
    EmptyEntry(&'static str),
    #[error("invalid past_tense_verbs: {0}")]
    Pattern(#[from] regex::Error),
}

pub struct RestEventFlowExtractor;

impl Extractor for RestEventFlowExtractor {
    fn id(&self) -> &str {
        "rest-event-flow"
    }

    fn display_name(&self) -> &str {
        "REST Event Flow"
    }

    fn priority(&self) -> i32 {
        150
    }

    fn reads(&self) -> &[FactKind] {
        &[FactKind::ApiEndpoint]
    }

    fn groups(&self) -> &[&'static str] {
        &["messaging"]
    }

    fn applies_to(&self, ctx: &RunContext) -> bool {
        ctx.prior_facts().endpoints().next().is_some()
    }

    fn extract(&self, ctx: &RunContext) -> Envelope {
        let endpoints: Vec<&ApiEndpoint> = ctx.prior_facts().endpoints().collect();
        if endpoints.is_empty() {
            return Envelope::empty(self.id());
        }

        let heuristics = match Heuristics::from_context(ctx) {
            Ok(h) => h,
            Err(e) => return Envelope::failed(self.id(), vec![e.to_string()]),
        };

        info!(
            "Correlating {} endpoints into event flows",
            endpoints.len()
        );
        let mut facts = FactSet::new();
        facts.flows = heuristics.correlate(&endpoints);
        debug!("Inferred {} message flows", facts.flows.len());
        Envelope::success(self.id(), facts)
    }
}

/// Tunable correlation rules.
pub struct Heuristics {
    keywords: Vec<String>,
    past_tense: Option<Regex>,
    schema_suffixes: Vec<String>,
    detect_crud: bool,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            keywords: EVENT_PATH_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            past_tense: Some(DEFAULT_PAST_TENSE.clone()),
            schema_suffixes: EVENT_SCHEMA_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            detect_crud: true,
        }
    }
}

/// `[-_/](created|updated|...)([-_/]|$)`, case-insensitive.
fn past_tense_regex<S: AsRef<str>>(verbs: &[S]) -> Result<Regex, regex::Error> {
    let alternation = verbs
        .iter()
        .map(|v| regex::escape(v.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"[-_/]({})([-_/]|$)", alternation))
        .case_insensitive(true)
        .build()
}

/// An empty keyword or suffix would match every endpoint.
fn reject_empty(list: &'static str, entries: &[String]) -> Result<(), HeuristicsError> {
    if entries.iter().any(|e| e.trim().is_empty()) {
        return Err(HeuristicsError::EmptyEntry(list));
    }
    Ok(())
}

impl Heuristics {
    /// Compile the rules. An empty verb list disables the verb heuristic;
    /// an empty entry inside any list is rejected.
    pub fn new(
        keywords: Vec<String>,
        verbs: &[String],
        schema_suffixes: Vec<String>,
        detect_crud: bool,
    ) -> Result<Self, HeuristicsError> {
        reject_empty("event_path_keywords", &keywords)?;
        reject_empty("past_tense_verbs", verbs)?;
        reject_empty("schema_suffixes", &schema_suffixes)?;
        let past_tense = if verbs.is_empty() {
            None
        } else {
            Some(past_tense_regex(verbs)?)
        };
        Ok(Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            past_tense,
            schema_suffixes,
            detect_crud,
        })
    }

    /// Rules from the extractor's configuration, defaults for missing keys.
    pub fn from_context(ctx: &RunContext) -> Result<Self, HeuristicsError> {
        let defaults = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self::new(
            ctx.config_str_list("event_path_keywords")
                .unwrap_or_else(|| defaults(EVENT_PATH_KEYWORDS)),
            &ctx.config_str_list("past_tense_verbs")
                .unwrap_or_else(|| defaults(PAST_TENSE_VERBS)),
            ctx.config_str_list("schema_suffixes")
                .unwrap_or_else(|| defaults(EVENT_SCHEMA_SUFFIXES)),
            ctx.config_bool("detect_crud_patterns", true),
        )
    }

    /// Event flows in endpoint order, then CRUD flows in first-seen base-path order.
    pub fn correlate(&self, endpoints: &[&ApiEndpoint]) -> Vec<MessageFlow> {
        let mut flows: Vec<MessageFlow> = endpoints
            .iter()
            .filter_map(|e| self.event_flow(e))
            .collect();
        if self.detect_crud {
            flows.extend(crud_flows(endpoints));
        }
        flows
    }

    pub fn is_event_endpoint(&self, endpoint: &ApiEndpoint) -> bool {
        let path = endpoint.path.to_lowercase();
        let by_path = self.keywords.iter().any(|k| path.contains(k.as_str()));
        let by_verb = endpoint.verb.eq_ignore_ascii_case("POST")
            && self
                .past_tense
                .as_ref()
                .map(|re| re.is_match(&path))
                .unwrap_or(false);
        let by_schema = [&endpoint.request_schema, &endpoint.response_schema]
            .iter()
            .filter_map(|s| s.as_deref())
            .any(|s| self.schema_suffixes.iter().any(|suffix| s.ends_with(suffix.as_str())));
        by_path || by_verb || by_schema
    }

    fn event_flow(&self, endpoint: &ApiEndpoint) -> Option<MessageFlow> {
        if !self.is_event_endpoint(endpoint) {
            return None;
        }
        debug!(
            "{} {} looks like an event endpoint",
            endpoint.verb, endpoint.path
        );
        Some(MessageFlow {
            publisher: None,
            subscriber: Some(endpoint.component.clone()),
            topic: endpoint.path.clone(),
            message_type: message_type(endpoint),
            schema: endpoint.request_schema.clone(),
            broker: REST_EVENT_BROKER.to_string(),
        })
    }
}

/// Request schema, else the last path segment as `PascalCaseEvent`.
fn message_type(endpoint: &ApiEndpoint) -> String {
    if let Some(schema) = endpoint.request_schema.as_deref().filter(|s| !s.is_empty()) {
        return schema.to_string();
    }
    match endpoint.path.trim_end_matches('/').rsplit('/').next() {
        Some(last) if !last.is_empty() && !last.starts_with('{') => {
            format!("{}Event", pascal_case(last))
        }
        _ => "UnknownEvent".to_string(),
    }
}

/// `order-created` -> `OrderCreated`.
fn pascal_case(input: &str) -> String {
    input
        .split(|c: char| c == '-' || c == '_')
        .filter(|p| !p.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// Path with `{var}` and `:var` segments and a trailing slash removed.
pub fn base_path(path: &str) -> String {
    let stripped = BRACED_VARIABLE.replace_all(path, "");
    let stripped = COLON_VARIABLE.replace_all(&stripped, "");
    let mut base = stripped.to_string();
    if base.len() > 1 && base.ends_with('/') {
        base.pop();
    }
    if base.is_empty() {
        "/".to_string()
    } else {
        base
    }
}

/// Singular, capitalized last meaningful segment of a base path.
pub fn resource_name(base_path: &str) -> String {
    base_path
        .rsplit('/')
        .map(str::trim)
        .find(|part| !part.is_empty() && *part != "api" && !VERSION_SEGMENT.is_match(part))
        .map(|part| {
            let singular = if part.len() > 1 && part.ends_with('s') {
                &part[..part.len() - 1]
            } else {
                part
            };
            let mut chars = singular.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .unwrap_or_else(|| "Resource".to_string())
}

/// One flow per base path that has GET plus POST, PUT or PATCH.
fn crud_flows(endpoints: &[&ApiEndpoint]) -> Vec<MessageFlow> {
    let mut groups: Vec<(String, Vec<&ApiEndpoint>)> = Vec::new();
    for &endpoint in endpoints {
        let base = base_path(&endpoint.path);
        match groups.iter_mut().find(|(b, _)| *b == base) {
            Some((_, members)) => members.push(endpoint),
            None => groups.push((base, vec![endpoint])),
        }
    }

    groups
        .into_iter()
        .filter_map(|(base, members)| {
            let has = |verb: &str| members.iter().any(|e| e.verb.eq_ignore_ascii_case(verb));
            if !(has("GET") && (has("POST") || has("PUT") || has("PATCH"))) {
                return None;
            }
            let component = members[0].component.clone();
            debug!("CRUD pattern on {}", base);
            Some(MessageFlow {
                publisher: Some(component.clone()),
                subscriber: Some(component),
                message_type: format!("{}Event", resource_name(&base)),
                topic: base,
                schema: None,
                broker: CRUD_BROKER.to_string(),
            })
        })
        .collect()
}
