// Score distribution against a recording bus: partial failures, alerts and telemetry

#[path = "../helpers/mod.rs"]
mod helpers;

use chrono::Duration;
use helpers::*;
use std::sync::Arc;

use scorewatch::modules::events::models::topics::{
    CREDIT_SCORE_CALCULATED, CREDIT_SCORE_MONITORING_ALERT, CREDIT_SCORE_UPDATED,
};
use scorewatch::modules::events::services::{DeferredJob, DeferredPublisher};
use scorewatch::modules::scoring::models::CreditScore;
use scorewatch::modules::scoring::repositories::{CreditScoreStore, InMemoryCreditScoreStore};

/// Previous LOW-risk score of 75 and a new HIGH-risk score of 25, stored
async fn degraded_pair(store: &InMemoryCreditScoreStore) -> (CreditScore, CreditScore) {
    let previous = credit_score("company-7", 75, utc(2026, 3, 1, 9));
    let current = credit_score("company-7", 25, utc(2026, 3, 2, 9)).with_previous(Some(&previous));
    store.save(&previous).await.unwrap();
    store.save(&current).await.unwrap();
    (previous, current)
}

#[tokio::test]
async fn test_first_score_publishes_calculated_and_marks_distributed() {
    let bus = Arc::new(RecordingBus::new());
    let store = Arc::new(InMemoryCreditScoreStore::new());
    let score = credit_score("company-7", 80, utc(2026, 3, 2, 9));
    store.save(&score).await.unwrap();
    let distributor = distributor(bus.clone(), store.clone());

    let result = distributor
        .distribute_credit_score_at(&score, None, utc(2026, 3, 2, 9))
        .await;

    assert!(result.success);
    assert_eq!(result.published_topics, vec![CREDIT_SCORE_CALCULATED.to_string()]);
    assert_eq!(result.alerts_published, 0);
    assert!(result.errors.is_empty());

    let events = bus.published().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["company_id"], "company-7");
    assert_eq!(events[0].payload["score"]["id"], score.id);

    let stored = store.find_by_id(&score.id).await.unwrap().unwrap();
    assert!(stored.distributed);
}

#[tokio::test]
async fn test_degradation_publishes_update_and_three_alerts() {
    let bus = Arc::new(RecordingBus::new());
    let store = Arc::new(InMemoryCreditScoreStore::new());
    let (previous, current) = degraded_pair(&store).await;
    let distributor = distributor(bus.clone(), store.clone());

    let result = distributor
        .distribute_credit_score_at(&current, Some(&previous), utc(2026, 3, 2, 9))
        .await;

    assert!(result.success);
    assert_eq!(result.alerts_published, 3);
    assert_eq!(
        result.published_topics,
        vec![
            CREDIT_SCORE_UPDATED.to_string(),
            CREDIT_SCORE_MONITORING_ALERT.to_string()
        ]
    );

    let events = bus.published().await;
    assert_eq!(events[0].payload["previous_score"], 75);
    assert_eq!(events[0].payload["new_score"], 25);
    assert_eq!(events[0].payload["previous_risk_level"], "LOW");

    let kinds: Vec<String> = events[1..]
        .iter()
        .map(|e| e.payload["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["critical_score", "score_degradation", "risk_level_change"]);
    assert_eq!(events[1].payload["severity"], "critical");
}

#[tokio::test]
async fn test_alert_failures_do_not_fail_distribution() {
    let bus = Arc::new(RecordingBus::failing_on(&[CREDIT_SCORE_MONITORING_ALERT]));
    let store = Arc::new(InMemoryCreditScoreStore::new());
    let (previous, current) = degraded_pair(&store).await;
    let distributor = distributor(bus.clone(), store.clone());

    let result = distributor
        .distribute_credit_score_at(&current, Some(&previous), utc(2026, 3, 2, 9))
        .await;

    assert!(result.success);
    assert!(result.marked_distributed);
    assert_eq!(result.alerts_published, 0);
    assert_eq!(result.errors.len(), 3);
    assert_eq!(bus.topics().await, vec![CREDIT_SCORE_UPDATED.to_string()]);
}

#[tokio::test]
async fn test_primary_failure_still_attempts_every_step() {
    let bus = Arc::new(RecordingBus::failing_all());
    let store = Arc::new(InMemoryCreditScoreStore::new());
    let (previous, current) = degraded_pair(&store).await;
    let distributor = distributor(bus.clone(), store.clone());

    let result = distributor
        .distribute_credit_score_at(&current, Some(&previous), utc(2026, 3, 2, 9))
        .await;

    assert!(!result.success);
    assert!(result.marked_distributed);
    assert_eq!(result.errors.len(), 4);
    assert!(result.errors[0].starts_with("primary publish"));

    let stats = distributor.metrics().snapshot();
    assert_eq!(stats.published, 0);
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.success_rate, 0.0);
}

#[tokio::test]
async fn test_unknown_score_cannot_be_marked() {
    let bus = Arc::new(RecordingBus::new());
    let store = Arc::new(InMemoryCreditScoreStore::new());
    let score = credit_score("company-7", 80, utc(2026, 3, 2, 9));
    let distributor = distributor(bus.clone(), store);

    let result = distributor
        .distribute_credit_score_at(&score, None, utc(2026, 3, 2, 9))
        .await;

    assert!(!result.success);
    assert!(!result.marked_distributed);
    assert_eq!(result.published_topics, vec![CREDIT_SCORE_CALCULATED.to_string()]);
    assert!(result.errors[0].starts_with("mark distributed"));
}

#[tokio::test]
async fn test_expiring_score_raises_low_severity_warning() {
    let bus = Arc::new(RecordingBus::new());
    let store = Arc::new(InMemoryCreditScoreStore::new());
    let calculated_at = utc(2026, 3, 1, 9);
    let score = credit_score("company-7", 80, calculated_at);
    store.save(&score).await.unwrap();
    let distributor = distributor(bus.clone(), store);

    let result = distributor
        .distribute_credit_score_at(&score, None, calculated_at + Duration::days(25))
        .await;

    assert_eq!(result.alerts_published, 1);
    let events = bus.published().await;
    assert_eq!(events[1].payload["kind"], "expiring_soon");
    assert_eq!(events[1].payload["severity"], "low");
}

#[tokio::test]
async fn test_metrics_track_successful_publishes() {
    let bus = Arc::new(RecordingBus::failing_on(&[CREDIT_SCORE_UPDATED]));
    let store = Arc::new(InMemoryCreditScoreStore::new());
    let (previous, current) = degraded_pair(&store).await;
    let distributor = distributor(bus, store);

    distributor
        .distribute_credit_score_at(&current, Some(&previous), utc(2026, 3, 2, 9))
        .await;

    let stats = distributor.metrics().snapshot();
    assert_eq!(stats.published, 3);
    assert_eq!(stats.failed, 1);
    assert!((stats.success_rate - 0.75).abs() < 1e-9);
}

#[tokio::test]
async fn test_deferred_queue_drains_into_distributor() {
    let bus = Arc::new(RecordingBus::new());
    let store = Arc::new(InMemoryCreditScoreStore::new());
    let score = credit_score("company-7", 80, utc(2026, 3, 2, 9));
    store.save(&score).await.unwrap();
    let distributor = Arc::new(distributor(bus.clone(), store.clone()));

    let (publisher, worker) = DeferredPublisher::spawn(distributor, 8);
    publisher
        .enqueue(DeferredJob::DistributeScore {
            score: score.clone(),
            previous: None,
        })
        .unwrap();
    publisher
        .enqueue(DeferredJob::Publish {
            topic: "customer.created".to_string(),
            payload: serde_json::json!({"customer_id": "cust-1"}),
            description: "Customer created".to_string(),
        })
        .unwrap();

    // Closing the queue lets the worker finish what is already buffered
    drop(publisher);
    worker.await.unwrap();

    let topics = bus.topics().await;
    assert_eq!(topics[0], CREDIT_SCORE_CALCULATED);
    assert_eq!(topics[1], "customer.lifecycle.created");
    assert!(store.find_by_id(&score.id).await.unwrap().unwrap().distributed);
}
