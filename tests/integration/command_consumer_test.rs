// Inbound commands: authorization, field filtering, read responses and score requests

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::*;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

use scorewatch::modules::commands::models::{
    CommandOutcome, ReadRequest, ResourceType, UpdateCommand,
};
use scorewatch::modules::commands::services::{
    CommandConsumer, InMemoryResourceStore, InboundCommandAuthorizer, ResourceStore,
};
use scorewatch::modules::events::models::topics::{
    CREDIT_SCORE_REQUEST, CREDIT_SCORE_RESPONSE, CUSTOMER_DATA_REQUEST, CUSTOMER_UPDATED,
    CUSTOMER_UPDATE_REQUEST,
};
use scorewatch::modules::events::models::{DomainEvent, ScoreRequestPayload};
use scorewatch::modules::events::services::{EventBus, InProcessEventBus};
use scorewatch::modules::scoring::repositories::{CreditScoreStore, InMemoryCreditScoreStore};

struct Harness {
    consumer: CommandConsumer,
    bus: Arc<RecordingBus>,
    resources: Arc<InMemoryResourceStore>,
    scores: Arc<InMemoryCreditScoreStore>,
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

async fn harness() -> Harness {
    let bus = Arc::new(RecordingBus::new());
    let resources = Arc::new(InMemoryResourceStore::new());
    let scores = Arc::new(InMemoryCreditScoreStore::new());
    resources
        .insert(
            ResourceType::Customer,
            "cust-1",
            fields(json!({"name": "Acme Ltd", "status": "active"})),
        )
        .await;

    let consumer = CommandConsumer::new(
        InboundCommandAuthorizer::new(),
        resources.clone(),
        scores.clone(),
        Arc::new(distributor(bus.clone(), scores.clone())),
    );

    Harness {
        consumer,
        bus,
        resources,
        scores,
    }
}

fn update(service: &str, update_fields: Value) -> UpdateCommand {
    UpdateCommand {
        company_id: "cust-1".to_string(),
        requesting_service: service.to_string(),
        update_fields: fields(update_fields),
        request_id: Some("req-1".to_string()),
        resource_type: "customer".to_string(),
    }
}

#[tokio::test]
async fn test_update_applies_only_allowed_fields() {
    let h = harness().await;

    let outcome = h
        .consumer
        .handle_update(update(
            "customer-service",
            json!({"name": "Acme Group", "credit_score": 99, "role": "admin"}),
        ))
        .await;

    match outcome {
        CommandOutcome::Applied {
            applied_fields,
            mut dropped_fields,
        } => {
            assert_eq!(applied_fields, vec!["name".to_string()]);
            dropped_fields.sort();
            assert_eq!(dropped_fields, vec!["credit_score".to_string(), "role".to_string()]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let stored = h
        .resources
        .fetch(ResourceType::Customer, "cust-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["name"], "Acme Group");
    assert_eq!(stored["status"], "active");
    assert!(stored.get("credit_score").is_none());

    let events = h.bus.published().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].topic, CUSTOMER_UPDATED);
    assert_eq!(events[0].payload["updated_fields"], json!({"name": "Acme Group"}));
}

#[tokio::test]
async fn test_update_from_read_only_service_is_rejected() {
    let h = harness().await;

    let outcome = h
        .consumer
        .handle_update(update("financing-service", json!({"name": "Hijacked"})))
        .await;

    assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
    let stored = h
        .resources
        .fetch(ResourceType::Customer, "cust-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["name"], "Acme Ltd");
    assert!(h.bus.published().await.is_empty());
}

#[tokio::test]
async fn test_update_of_missing_resource_is_not_found() {
    let h = harness().await;
    let mut command = update("customer-service", json!({"name": "Ghost"}));
    command.company_id = "cust-404".to_string();

    let outcome = h.consumer.handle_update(command).await;

    assert_eq!(outcome, CommandOutcome::NotFound);
}

fn read(service: &str, request_type: &str, entity_id: &str) -> ReadRequest {
    ReadRequest {
        requesting_service: service.to_string(),
        request_type: request_type.to_string(),
        entity_id: entity_id.to_string(),
        response_pattern: "financing.responses".to_string(),
        request_id: Some("read-1".to_string()),
    }
}

#[tokio::test]
async fn test_read_request_is_answered_on_response_topic() {
    let h = harness().await;

    let response = h
        .consumer
        .handle_read(read("financing-service", "get_customer", "cust-1"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.data.as_ref().unwrap()["name"], "Acme Ltd");

    let events = h.bus.published().await;
    assert_eq!(events[0].topic, "financing.responses");
    assert_eq!(events[0].payload["request_id"], "read-1");
    assert_eq!(events[0].payload["status"], 200);
}

#[tokio::test]
async fn test_unauthorized_read_publishes_forbidden_without_data() {
    let h = harness().await;

    let response = h
        .consumer
        .handle_read(read("financing-service", "get_financial_data", "cust-1"))
        .await;

    assert_eq!(response.status, 403);
    assert!(response.data.is_none());

    let events = h.bus.published().await;
    assert_eq!(events[0].topic, "financing.responses");
    assert_eq!(events[0].payload["data"], Value::Null);
    assert!(events[0].payload["error"].is_string());
}

#[tokio::test]
async fn test_read_of_unknown_entity_is_not_found() {
    let h = harness().await;

    let response = h
        .consumer
        .handle_read(read("accounting-service", "get_customer", "cust-404"))
        .await;

    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_credit_score_read_comes_from_score_store() {
    let h = harness().await;
    let score = credit_score("cust-1", 64, utc(2026, 3, 2, 9));
    h.scores.save(&score).await.unwrap();

    let response = h
        .consumer
        .handle_read(read("financing-service", "get_credit_score", "cust-1"))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.data.unwrap()["score"], 64);
}

#[tokio::test]
async fn test_score_request_answers_with_latest_score() {
    let h = harness().await;
    h.scores
        .save(&credit_score("cust-1", 55, utc(2026, 3, 1, 9)))
        .await
        .unwrap();
    h.scores
        .save(&credit_score("cust-1", 61, utc(2026, 3, 2, 9)))
        .await
        .unwrap();

    let response = h
        .consumer
        .handle_score_request(ScoreRequestPayload {
            request_id: "score-req-9".to_string(),
            company_id: "cust-1".to_string(),
            requesting_service: "financing-service".to_string(),
            timestamp: None,
        })
        .await;

    assert_eq!(response.score.as_ref().map(|s| s.score), Some(61));
    assert!(response.error.is_none());

    let events = h.bus.published().await;
    assert_eq!(events[0].topic, CREDIT_SCORE_RESPONSE);
    assert_eq!(events[0].payload["request_id"], "score-req-9");
}

#[tokio::test]
async fn test_score_request_without_score_carries_error() {
    let h = harness().await;

    let response = h
        .consumer
        .handle_score_request(ScoreRequestPayload {
            request_id: "score-req-10".to_string(),
            company_id: "cust-2".to_string(),
            requesting_service: "financing-service".to_string(),
            timestamp: None,
        })
        .await;

    assert!(response.score.is_none());
    assert!(response.error.is_some());
}

#[tokio::test]
async fn test_dispatch_routes_legacy_topic_names() {
    let h = harness().await;
    let event = DomainEvent::wrap(
        "customer.update.request".to_string(),
        json!({
            "customerId": "cust-1",
            "requesting_service": "customer-service",
            "update_fields": {"status": "suspended"}
        }),
        "customer-service",
        "1.0",
        "Update customer",
    );

    h.consumer.dispatch(&event).await;

    let stored = h
        .resources
        .fetch(ResourceType::Customer, "cust-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["status"], "suspended");
}

#[tokio::test]
async fn test_dispatch_accepts_camel_case_payloads() {
    let h = harness().await;
    h.scores
        .save(&credit_score("cust-1", 58, utc(2026, 3, 2, 9)))
        .await
        .unwrap();

    let commands = [
        (
            CUSTOMER_UPDATE_REQUEST,
            json!({
                "customerId": "cust-1",
                "requestingService": "customer-service",
                "updateFields": {"status": "suspended"},
                "requestId": "req-camel"
            }),
        ),
        (
            CUSTOMER_DATA_REQUEST,
            json!({
                "requestingService": "financing-service",
                "requestType": "get_customer",
                "entityId": "cust-1",
                "responsePattern": "financing.responses",
                "requestId": "read-camel"
            }),
        ),
        (
            CREDIT_SCORE_REQUEST,
            json!({
                "requestId": "score-camel",
                "companyId": "cust-1",
                "requestingService": "financing-service"
            }),
        ),
    ];
    for (topic, payload) in commands {
        let event = DomainEvent::wrap(topic.to_string(), payload, "gateway", "1.0", "camelCase");
        h.consumer.dispatch(&event).await;
    }

    let stored = h
        .resources
        .fetch(ResourceType::Customer, "cust-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["status"], "suspended");

    let events = h.bus.published().await;
    let topics: Vec<&str> = events.iter().map(|e| e.topic.as_str()).collect();
    assert_eq!(
        topics,
        vec![CUSTOMER_UPDATED, "financing.responses", CREDIT_SCORE_RESPONSE]
    );
    assert_eq!(events[1].payload["request_id"], "read-camel");
    assert_eq!(events[1].payload["data"]["status"], "suspended");
    assert_eq!(events[2].payload["request_id"], "score-camel");
    assert_eq!(events[2].payload["score"]["score"], 58);
}

#[tokio::test]
async fn test_consumer_runs_against_in_process_bus() {
    let bus = Arc::new(InProcessEventBus::new(64));
    let resources = Arc::new(InMemoryResourceStore::new());
    let scores = Arc::new(InMemoryCreditScoreStore::new());
    resources
        .insert(ResourceType::Customer, "cust-1", fields(json!({"name": "Acme Ltd"})))
        .await;

    let consumer = Arc::new(CommandConsumer::new(
        InboundCommandAuthorizer::new(),
        resources.clone(),
        scores.clone(),
        Arc::new(distributor(bus.clone(), scores)),
    ));
    let mut observer = bus.subscribe();
    tokio::spawn(consumer.run(bus.subscribe()));

    let command = DomainEvent::wrap(
        CUSTOMER_UPDATE_REQUEST.to_string(),
        json!({
            "company_id": "cust-1",
            "requesting_service": "customer-service",
            "update_fields": {"phone": "+62-21-555"}
        }),
        "customer-service",
        "1.0",
        "Update customer",
    );
    bus.publish(&command).await.unwrap();

    let projected = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = observer.recv().await.unwrap();
            if event.topic == CUSTOMER_UPDATED {
                return event;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(projected.payload["company_id"], "cust-1");
    let stored = resources
        .fetch(ResourceType::Customer, "cust-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["phone"], "+62-21-555");
}
