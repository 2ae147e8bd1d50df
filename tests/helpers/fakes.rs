use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use scorewatch::core::{AppError, Result};
use scorewatch::modules::events::models::DomainEvent;
use scorewatch::modules::events::services::EventBus;
use scorewatch::modules::scoring::services::{
    ExternalScoringClient, MlScoringRequest, MlScoringResponse,
};

/// ML client answering with a fixed prediction, or always failing
pub struct StubScoringClient {
    response: Option<MlScoringResponse>,
    calls: AtomicUsize,
}

impl StubScoringClient {
    pub fn returning(prediction: f64, confidence: f64) -> Self {
        Self {
            response: Some(MlScoringResponse {
                prediction,
                model_version: "ml-test-v2".to_string(),
                confidence,
                component_scores: None,
                risk_level: Some("MEDIUM".to_string()),
                risk_factors: vec!["Short credit history".to_string()],
                recommendations: vec!["Diversify revenue".to_string()],
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalScoringClient for StubScoringClient {
    async fn predict(&self, _request: &MlScoringRequest) -> Result<MlScoringResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .ok_or_else(|| AppError::external("ML scoring service timed out"))
    }
}

/// Bus that records every accepted event and rejects selected topics
#[derive(Default)]
pub struct RecordingBus {
    failing_topics: Vec<String>,
    fail_all: bool,
    published: Mutex<Vec<DomainEvent>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(topics: &[&str]) -> Self {
        Self {
            failing_topics: topics.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub async fn published(&self) -> Vec<DomainEvent> {
        self.published.lock().await.clone()
    }

    pub async fn topics(&self) -> Vec<String> {
        self.published
            .lock()
            .await
            .iter()
            .map(|e| e.topic.clone())
            .collect()
    }
}

#[async_trait]
impl EventBus for RecordingBus {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        if self.fail_all || self.failing_topics.contains(&event.topic) {
            return Err(AppError::distribution(format!(
                "broker rejected {}",
                event.topic
            )));
        }
        self.published.lock().await.push(event.clone());
        Ok(())
    }
}
