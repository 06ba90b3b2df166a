//! Kafka producers and consumers in Java sources.
//!
//! Consumers are `@KafkaListener` methods; `@SendTo` on a listener marks a
//! reply publisher. Producers are `send("topic", ...)` calls on a receiver
//! that looks like a Kafka template.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use tree_sitter::Node;

use super::{parallel, tiered_envelope};
use crate::analysis::query::{children_of_kind, first_string_literal, run_query, string_literals};
use crate::analysis::{annotations, find_annotation, java_analyzer, members, LanguageAnalyzer, ParsedFile};
use crate::extract::applicability::{has_dependency, has_files};
use crate::extract::{run_tiered, Extractor, RunContext, SourceFile, TieredSource};
use crate::model::{Envelope, FactKind, MessageFlow, Relationship, RelationshipKind};

const JAVA_GLOB: &str = "**/*.java";
const BROKER: &str = "kafka";
const UNKNOWN_TYPE: &str = "Object";

const SEND_QUERY: &str = r#"
(method_invocation
  object: (_) @receiver
  name: (identifier) @method
  arguments: (argument_list) @args
) @call
"#;

lazy_static! {
    static ref PACKAGE: Regex = Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").unwrap();
    static ref CLASS: Regex = Regex::new(r"\bclass\s+(\w+)").unwrap();
    static ref LISTENER: Regex = Regex::new(r"@KafkaListener\s*\(([^)]*)\)").unwrap();
    static ref TOPICS_ARG: Regex =
        Regex::new(r#"(?:topics|value)\s*=\s*(\{[^}]*\}|"[^"]*")"#).unwrap();
    static ref POSITIONAL_ARG: Regex = Regex::new(r#"^\s*(\{[^}]*\}|"[^"]*")"#).unwrap();
    static ref FIRST_PARAM: Regex = Regex::new(
        r"^\s*(?:@\w+(?:\s*\([^)]*\))?\s*)*[\w\s<>\[\],.?]*?\w+\s*\(\s*(?:final\s+)?(?:@\w+(?:\([^)]*\))?\s+)*([\w.]+(?:<[^()]*?>)?)\s+\w+\s*[,)]"
    )
    .unwrap();
    static ref SEND_CALL: Regex =
        Regex::new(r#"(\w+)\s*\.\s*send\s*\(\s*("[^"]*"|[\w.]+)"#).unwrap();
}

pub struct KafkaMessagingExtractor;

impl Extractor for KafkaMessagingExtractor {
    fn id(&self) -> &str {
        "kafka-messaging"
    }

    fn display_name(&self) -> &str {
        "Kafka Messaging"
    }

    fn priority(&self) -> i32 {
        70
    }

    fn reads(&self) -> &[FactKind] {
        &[FactKind::Dependency]
    }

    fn groups(&self) -> &[&'static str] {
        &["java", "messaging"]
    }

    fn applies_to(&self, ctx: &RunContext) -> bool {
        has_files(ctx, &[JAVA_GLOB]) && has_dependency(ctx, "kafka")
    }

    fn extract(&self, ctx: &RunContext) -> Envelope {
        let files = ctx.find_files(JAVA_GLOB);
        let run = run_tiered(&KafkaSource, &files, parallel(ctx));
        tiered_envelope(self.id(), run, |flows, facts| {
            facts.relationships = flow_relationships(&flows);
            facts.flows = flows;
        })
    }
}

/// PUBLISHES / SUBSCRIBES edges from components to `kafka:<topic>`.
fn flow_relationships(flows: &[MessageFlow]) -> Vec<Relationship> {
    let mut relationships = Vec::new();
    for flow in flows {
        let target = format!("{}:{}", BROKER, flow.topic);
        if let Some(publisher) = &flow.publisher {
            relationships.push(
                Relationship::new(publisher, &target, RelationshipKind::Publishes)
                    .with_technology(BROKER),
            );
        }
        if let Some(subscriber) = &flow.subscriber {
            relationships.push(
                Relationship::new(subscriber, &target, RelationshipKind::Subscribes)
                    .with_technology(BROKER),
            );
        }
    }
    relationships
}

fn publisher_flow(component: &str, topic: String, message_type: String) -> MessageFlow {
    MessageFlow {
        publisher: Some(component.to_string()),
        subscriber: None,
        topic,
        message_type,
        schema: None,
        broker: BROKER.to_string(),
    }
}

fn subscriber_flow(component: &str, topic: String, message_type: String) -> MessageFlow {
    MessageFlow {
        publisher: None,
        subscriber: Some(component.to_string()),
        topic,
        message_type,
        schema: None,
        broker: BROKER.to_string(),
    }
}

fn is_template_receiver(receiver: &str) -> bool {
    let lower = receiver.to_ascii_lowercase();
    lower.contains("kafka") || lower.contains("template")
}

/// Nearest enclosing class declaration.
fn enclosing_class(node: Node) -> Option<Node> {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "class_declaration" {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

struct KafkaSource;

impl TieredSource for KafkaSource {
    type Fact = MessageFlow;

    fn structural(&self, parsed: &ParsedFile, _file: &SourceFile) -> anyhow::Result<Vec<MessageFlow>> {
        let java = java_analyzer();
        let grammar = java.grammar(Path::new(""));
        let mut flows = Vec::new();

        for class in java.classes(parsed)? {
            let component = class.qualified_name.as_str();

            for method in members(class.node, "method_declaration") {
                let method_annotations = annotations(parsed, method);
                if let Some(listener) = find_annotation(&method_annotations, "KafkaListener") {
                    let message_type = method
                        .child_by_field_name("parameters")
                        .and_then(|p| children_of_kind(p, "formal_parameter").into_iter().next())
                        .and_then(|p| p.child_by_field_name("type"))
                        .map(|t| parsed.node_text(t).to_string())
                        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
                    for topic in listener.strings(&["topics", "value"]) {
                        flows.push(subscriber_flow(component, topic, message_type.clone()));
                    }
                }
                if let Some(send_to) = find_annotation(&method_annotations, "SendTo") {
                    let reply_type = method
                        .child_by_field_name("type")
                        .map(|t| parsed.node_text(t).to_string())
                        .filter(|t| t != "void")
                        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
                    for topic in send_to.strings(&["value"]) {
                        flows.push(publisher_flow(component, topic, reply_type.clone()));
                    }
                }
            }

            let Some(body) = class.node.child_by_field_name("body") else {
                continue;
            };
            for call in run_query(parsed, &grammar, SEND_QUERY, body)? {
                let (Some(node), Some(receiver), Some(method), Some(args)) = (
                    call.get("call"),
                    call.get("receiver"),
                    call.get("method"),
                    call.get("args"),
                ) else {
                    continue;
                };
                if parsed.node_text(method) != "send"
                    || !is_template_receiver(parsed.node_text(receiver))
                    || enclosing_class(node).map(|c| c.id()) != Some(class.node.id())
                {
                    continue;
                }
                let mut cursor = args.walk();
                let Some(first) = args.named_children(&mut cursor).next() else {
                    continue;
                };
                let text = parsed.node_text(first);
                let topic = match first.kind() {
                    "string_literal" => first_string_literal(text).unwrap_or_default(),
                    _ => text.to_string(),
                };
                if topic.is_empty() {
                    continue;
                }
                flows.push(publisher_flow(component, topic, UNKNOWN_TYPE.to_string()));
            }
        }

        Ok(flows)
    }

    fn fallback(&self, text: &str, _file: &SourceFile) -> Vec<MessageFlow> {
        let Some(class) = CLASS.captures(text) else {
            return Vec::new();
        };
        let component = match PACKAGE.captures(text) {
            Some(pkg) => format!("{}.{}", &pkg[1], &class[1]),
            None => class[1].to_string(),
        };

        let mut flows = Vec::new();
        for caps in LISTENER.captures_iter(text) {
            let args = &caps[1];
            let topics = TOPICS_ARG
                .captures(args)
                .or_else(|| POSITIONAL_ARG.captures(args))
                .map(|t| string_literals(&t[1]))
                .unwrap_or_default();
            let after = caps.get(0).map(|m| m.end()).unwrap_or(text.len());
            let message_type = FIRST_PARAM
                .captures(&text[after..])
                .map(|p| p[1].to_string())
                .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
            for topic in topics {
                flows.push(subscriber_flow(&component, topic, message_type.clone()));
            }
        }

        for caps in SEND_CALL.captures_iter(text) {
            if !is_template_receiver(&caps[1]) {
                continue;
            }
            let raw = &caps[2];
            let topic = first_string_literal(raw).unwrap_or_else(|| raw.to_string());
            if !topic.is_empty() {
                flows.push(publisher_flow(&component, topic, UNKNOWN_TYPE.to_string()));
            }
        }

        flows
    }
}
