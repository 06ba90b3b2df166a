//! Architectural fact types produced by extractors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of architectural component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Service,
    Module,
    Library,
    External,
    Database,
    MessageBroker,
    Unknown,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Service => "service",
            ComponentKind::Module => "module",
            ComponentKind::Library => "library",
            ComponentKind::External => "external",
            ComponentKind::Database => "database",
            ComponentKind::MessageBroker => "message-broker",
            ComponentKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A deployable or buildable unit: a service, module, library, etc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    /// Repository-relative path of the manifest or source that defined it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Component {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            description: None,
            technology: None,
            location: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = Some(technology.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Dependency scope, following build-tool conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    #[default]
    Compile,
    Test,
    Provided,
    Runtime,
}

impl DependencyScope {
    /// Map a build-file scope string. Unknown or missing scopes are compile scope.
    pub fn parse(scope: Option<&str>) -> Self {
        match scope.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("test") => DependencyScope::Test,
            Some("provided") => DependencyScope::Provided,
            Some("runtime") => DependencyScope::Runtime,
            _ => DependencyScope::Compile,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyScope::Compile => "compile",
            DependencyScope::Test => "test",
            DependencyScope::Provided => "provided",
            DependencyScope::Runtime => "runtime",
        }
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declared dependency of a component on an external artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub source_component: String,
    pub group: String,
    pub artifact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub scope: DependencyScope,
    pub direct: bool,
}

impl Dependency {
    /// `group:artifact:version` with empty parts left blank.
    pub fn coordinate(&self) -> String {
        format!(
            "{}:{}:{}",
            self.group,
            self.artifact,
            self.version.as_deref().unwrap_or("")
        )
    }

    /// Case-insensitive substring match on group or artifact.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.group.to_ascii_lowercase().contains(&needle)
            || self.artifact.to_ascii_lowercase().contains(&needle)
    }
}

/// API protocol of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKind {
    Rest,
    Grpc,
    GraphqlQuery,
    GraphqlMutation,
    GraphqlSubscription,
    Websocket,
    Soap,
}

impl ApiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKind::Rest => "REST",
            ApiKind::Grpc => "GRPC",
            ApiKind::GraphqlQuery => "GRAPHQL_QUERY",
            ApiKind::GraphqlMutation => "GRAPHQL_MUTATION",
            ApiKind::GraphqlSubscription => "GRAPHQL_SUBSCRIPTION",
            ApiKind::Websocket => "WEBSOCKET",
            ApiKind::Soap => "SOAP",
        }
    }
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An exposed API operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub component: String,
    pub kind: ApiKind,
    pub path: String,
    /// Upper-case HTTP verb for REST endpoints, operation type otherwise.
    pub verb: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

impl ApiEndpoint {
    pub fn rest(
        component: impl Into<String>,
        verb: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            kind: ApiKind::Rest,
            path: path.into(),
            verb: verb.into().to_ascii_uppercase(),
            description: None,
            request_schema: None,
            response_schema: None,
            auth: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_request_schema(mut self, schema: Option<String>) -> Self {
        self.request_schema = schema;
        self
    }

    pub fn with_response_schema(mut self, schema: Option<String>) -> Self {
        self.response_schema = schema;
        self
    }
}

/// An asynchronous message exchange between components.
///
/// At least one of publisher or subscriber is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFlow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber: Option<String>,
    pub topic: String,
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub broker: String,
}

/// One column or attribute of a data entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A persisted data structure: table, collection or message schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntity {
    pub component: String,
    pub name: String,
    /// "table", "collection", "message-schema", ...
    pub kind: String,
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Kind of directed relationship between two components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    Calls,
    Uses,
    Publishes,
    Subscribes,
    DependsOn,
    ReadsFrom,
    WritesTo,
    Contains,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Calls => "CALLS",
            RelationshipKind::Uses => "USES",
            RelationshipKind::Publishes => "PUBLISHES",
            RelationshipKind::Subscribes => "SUBSCRIBES",
            RelationshipKind::DependsOn => "DEPENDS_ON",
            RelationshipKind::ReadsFrom => "READS_FROM",
            RelationshipKind::WritesTo => "WRITES_TO",
            RelationshipKind::Contains => "CONTAINS",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub kind: RelationshipKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
}

impl Relationship {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: RelationshipKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            description: None,
            technology: None,
        }
    }

    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = Some(technology.into());
        self
    }
}

/// The six fact categories an extractor can emit or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FactKind {
    Component,
    Dependency,
    ApiEndpoint,
    MessageFlow,
    DataEntity,
    Relationship,
}

impl FactKind {
    pub const ALL: [FactKind; 6] = [
        FactKind::Component,
        FactKind::Dependency,
        FactKind::ApiEndpoint,
        FactKind::MessageFlow,
        FactKind::DataEntity,
        FactKind::Relationship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::Component => "component",
            FactKind::Dependency => "dependency",
            FactKind::ApiEndpoint => "api-endpoint",
            FactKind::MessageFlow => "message-flow",
            FactKind::DataEntity => "data-entity",
            FactKind::Relationship => "relationship",
        }
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered lists of every fact kind. Empty lists mean nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSet {
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub endpoints: Vec<ApiEndpoint>,
    #[serde(default)]
    pub flows: Vec<MessageFlow>,
    #[serde(default)]
    pub entities: Vec<DataEntity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of facts across all kinds.
    pub fn len(&self) -> usize {
        FactKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: FactKind) -> usize {
        match kind {
            FactKind::Component => self.components.len(),
            FactKind::Dependency => self.dependencies.len(),
            FactKind::ApiEndpoint => self.endpoints.len(),
            FactKind::MessageFlow => self.flows.len(),
            FactKind::DataEntity => self.entities.len(),
            FactKind::Relationship => self.relationships.len(),
        }
    }

    /// Append another set, preserving order.
    pub fn extend(&mut self, other: FactSet) {
        self.components.extend(other.components);
        self.dependencies.extend(other.dependencies);
        self.endpoints.extend(other.endpoints);
        self.flows.extend(other.flows);
        self.entities.extend(other.entities);
        self.relationships.extend(other.relationships);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_scope_parse() {
        assert_eq!(DependencyScope::parse(None), DependencyScope::Compile);
        assert_eq!(DependencyScope::parse(Some("test")), DependencyScope::Test);
        assert_eq!(DependencyScope::parse(Some(" Provided ")), DependencyScope::Provided);
        assert_eq!(DependencyScope::parse(Some("system")), DependencyScope::Compile);
    }

    #[test]
    fn test_dependency_mentions_is_case_insensitive() {
        let dep = Dependency {
            source_component: "app".to_string(),
            group: "org.springframework.kafka".to_string(),
            artifact: "spring-kafka".to_string(),
            version: None,
            scope: DependencyScope::Compile,
            direct: true,
        };
        assert!(dep.mentions("KAFKA"));
        assert!(!dep.mentions("rabbit"));
        assert_eq!(dep.coordinate(), "org.springframework.kafka:spring-kafka:");
    }

    #[test]
    fn test_fact_set_counts() {
        let mut set = FactSet::new();
        assert!(set.is_empty());
        set.endpoints.push(ApiEndpoint::rest("svc", "get", "/orders"));
        set.components
            .push(Component::new("svc", "svc", ComponentKind::Service));
        assert_eq!(set.len(), 2);
        assert_eq!(set.count(FactKind::ApiEndpoint), 1);
        assert_eq!(set.endpoints[0].verb, "GET");
    }

    #[test]
    fn test_serialized_kind_names() {
        let json = serde_json::to_string(&ComponentKind::MessageBroker).unwrap();
        assert_eq!(json, "\"message-broker\"");
        let json = serde_json::to_string(&RelationshipKind::DependsOn).unwrap();
        assert_eq!(json, "\"DEPENDS_ON\"");
    }
}
