//! Integration tests for the built-in extractors.
//!
//! These run the full registry against the `testdata/shop` fixture: a Maven
//! service with Spring controllers, a JPA entity and Kafka messaging, plus a
//! FastAPI app, an Express gateway and a Go module.

use std::path::PathBuf;

use archfacts::model::{ComponentKind, DependencyScope, RelationshipKind};
use archfacts::pipeline::RunStatus;
use archfacts::quality::{self, GapSeverity};
use archfacts::ScanOutcome;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("shop")
}

fn scan_fixture() -> ScanOutcome {
    archfacts::scan(fixture_path()).expect("builtin registry should be valid")
}

fn summary<'a>(endpoints: impl Iterator<Item = &'a archfacts::model::ApiEndpoint>) -> Vec<String> {
    endpoints.map(|e| format!("{} {}", e.verb, e.path)).collect()
}

#[test]
fn test_every_extractor_runs_cleanly() {
    let outcome = scan_fixture();

    let ids: Vec<_> = outcome.runs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "maven-dependencies",
            "npm-dependencies",
            "go-modules",
            "spring-rest-api",
            "fastapi-routes",
            "express-routes",
            "jpa-entities",
            "kafka-messaging",
            "rest-event-flow",
        ]
    );
    assert!(
        outcome.runs.iter().all(|r| r.status == RunStatus::Succeeded),
        "runs: {:?}",
        outcome.runs
    );
    assert!(!outcome.has_failures());
    assert!(outcome.log.is_empty(), "log: {:?}", outcome.log);
}

#[test]
fn test_maven_component_and_dependencies() {
    let outcome = scan_fixture();
    let env = outcome.envelope("maven-dependencies").unwrap();

    let component = &env.components()[0];
    assert_eq!(component.id, "com.example:shop");
    assert_eq!(component.kind, ComponentKind::Service);
    assert_eq!(component.description.as_deref(), Some("Shop Service"));
    assert_eq!(component.location.as_deref(), Some("pom.xml"));

    let coordinates: Vec<_> = env.dependencies().iter().map(|d| d.coordinate()).collect();
    assert_eq!(
        coordinates,
        vec![
            "org.springframework.boot:spring-boot-starter-web:",
            "org.springframework.boot:spring-boot-starter-data-jpa:",
            "org.springframework.kafka:spring-kafka:3.1.1",
            "org.junit.jupiter:junit-jupiter:",
        ]
    );
    assert_eq!(env.dependencies()[3].scope, DependencyScope::Test);
}

#[test]
fn test_npm_and_go_manifests() {
    let outcome = scan_fixture();

    let npm = outcome.envelope("npm-dependencies").unwrap();
    assert_eq!(npm.components()[0].name, "gateway");
    assert_eq!(npm.components()[0].kind, ComponentKind::Service);
    let nest = npm
        .dependencies()
        .iter()
        .find(|d| d.artifact == "common")
        .unwrap();
    assert_eq!(nest.group, "@nestjs");
    let jest = npm.dependencies().iter().find(|d| d.artifact == "jest").unwrap();
    assert_eq!(jest.scope, DependencyScope::Test);

    let go = outcome.envelope("go-modules").unwrap();
    assert_eq!(go.components()[0].id, "github.com/example/inventory");
    let deps = go.dependencies();
    assert_eq!(deps.len(), 2);
    assert!(deps[0].direct);
    assert_eq!(deps[0].version.as_deref(), Some("v1.9.1"));
    assert!(!deps[1].direct, "// indirect requirement");
}

#[test]
fn test_spring_endpoints_with_fallback() {
    let outcome = scan_fixture();
    let env = outcome.envelope("spring-rest-api").unwrap();

    assert_eq!(
        summary(env.endpoints().iter()),
        vec![
            "GET /api/legacy/status",
            "GET /api/orders/{id}",
            "POST /api/orders",
            "PUT /api/orders/{id}",
            "POST /api/orders/{id}/cancelled",
        ]
    );
    let create = &env.endpoints()[2];
    assert_eq!(create.component, "com.example.shop.web.OrderController");
    assert_eq!(create.request_schema.as_deref(), Some("CreateOrderRequest"));
    assert_eq!(create.response_schema.as_deref(), Some("OrderDto"));

    // LegacyController.java is missing a brace and goes through the fallback.
    let stats = env.statistics().unwrap();
    assert_eq!(stats.files_scanned, 5);
    assert_eq!(stats.fallback, 1);
    assert_eq!(stats.failed, 0);
}

#[test]
fn test_python_and_express_endpoints() {
    let outcome = scan_fixture();

    let fastapi = outcome.envelope("fastapi-routes").unwrap();
    assert_eq!(
        summary(fastapi.endpoints().iter()),
        vec!["POST /webhooks/payment-completed", "GET /health"]
    );
    assert_eq!(fastapi.endpoints()[0].component, "notifications.app.main");
    assert_eq!(
        fastapi.endpoints()[0].request_schema.as_deref(),
        Some("PaymentNotification")
    );

    let express = outcome.envelope("express-routes").unwrap();
    assert_eq!(
        summary(express.endpoints().iter()),
        vec!["GET /products", "POST /products"]
    );
    assert_eq!(
        express.endpoints()[0].description.as_deref(),
        Some("gateway.src.routes.catalog.list")
    );
}

#[test]
fn test_jpa_entity() {
    let outcome = scan_fixture();
    let env = outcome.envelope("jpa-entities").unwrap();

    assert_eq!(env.entities().len(), 1);
    let orders = &env.entities()[0];
    assert_eq!(orders.name, "orders");
    assert_eq!(orders.component, "com.example.shop.domain.Order");
    assert_eq!(orders.primary_key.as_deref(), Some("id"));

    let fields: Vec<_> = orders.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["id", "customerId", "total", "customer"]);
    assert!(!orders.fields[1].nullable);
    assert!(orders.fields[2].nullable);
    assert_eq!(orders.fields[3].note.as_deref(), Some("@ManyToOne"));
}

#[test]
fn test_kafka_flows_and_relationships() {
    let outcome = scan_fixture();
    let env = outcome.envelope("kafka-messaging").unwrap();

    let flows = env.flows();
    assert_eq!(flows.len(), 2);
    assert_eq!(flows[0].topic, "order-created");
    assert_eq!(
        flows[0].publisher.as_deref(),
        Some("com.example.shop.messaging.OrderEventPublisher")
    );
    assert_eq!(flows[1].topic, "payment-completed");
    assert_eq!(flows[1].message_type, "PaymentCompletedEvent");
    assert!(flows.iter().all(|f| f.broker == "kafka"));

    let kinds: Vec<_> = env.relationships().iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![RelationshipKind::Publishes, RelationshipKind::Subscribes]
    );
    assert_eq!(env.relationships()[0].target, "kafka:order-created");
}

#[test]
fn test_rest_event_flows_from_all_endpoint_extractors() {
    let outcome = scan_fixture();
    let env = outcome.envelope("rest-event-flow").unwrap();

    let topics: Vec<_> = env
        .flows()
        .iter()
        .map(|f| (f.topic.as_str(), f.message_type.as_str(), f.broker.as_str()))
        .collect();
    assert_eq!(
        topics,
        vec![
            ("/api/orders/{id}/cancelled", "CancelledEvent", "rest-event"),
            (
                "/webhooks/payment-completed",
                "PaymentNotification",
                "rest-event"
            ),
            ("/api/orders", "OrderEvent", "restful-crud"),
            ("/products", "ProductEvent", "restful-crud"),
        ]
    );
    assert_eq!(
        env.flows()[1].subscriber.as_deref(),
        Some("notifications.app.main")
    );
    assert!(env.endpoints().is_empty());
}

#[test]
fn test_quality_report_for_fixture() {
    let outcome = scan_fixture();
    let report = quality::assess(&outcome);

    assert_eq!(report.fallback, 1);
    assert!(!report.has_errors());
    assert_eq!(report.gaps.len(), 1);
    assert_eq!(report.gaps[0].severity, GapSeverity::Info);
    assert_eq!(report.gaps[0].extractor_id, "spring-rest-api");
    assert!(report.confidence_score < 1.0);
}
