use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::monitoring::models::AlertSeverity;
use crate::modules::scoring::models::{CreditScore, RiskLevel};

/// Immutable envelope of every published event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    pub produced_by: String,
    pub timestamp: DateTime<Utc>,
    pub schema_version: String,
    pub description: String,
}

impl DomainEvent {
    /// Wrap a payload; when it is a JSON object its `event_id` is set to the envelope's
    pub fn wrap(
        topic: String,
        mut payload: serde_json::Value,
        produced_by: &str,
        schema_version: &str,
        description: &str,
    ) -> Self {
        let event_id = Uuid::new_v4();
        if let Some(object) = payload.as_object_mut() {
            object.insert(
                "event_id".to_string(),
                serde_json::Value::String(event_id.to_string()),
            );
        }
        Self {
            event_id,
            topic,
            payload,
            produced_by: produced_by.to_string(),
            timestamp: Utc::now(),
            schema_version: schema_version.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCalculatedPayload {
    pub company_id: String,
    pub timestamp: DateTime<Utc>,
    pub score: CreditScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdatedPayload {
    pub company_id: String,
    pub timestamp: DateTime<Utc>,
    pub previous_score: i32,
    pub new_score: i32,
    pub previous_risk_level: RiskLevel,
    pub score: CreditScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreExpiredPayload {
    pub company_id: String,
    pub timestamp: DateTime<Utc>,
    pub score_id: String,
    pub score: i32,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreAlertKind {
    CriticalScore,
    ScoreDegradation,
    RiskLevelChange,
    ExpiringSoon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAlertPayload {
    pub company_id: String,
    pub timestamp: DateTime<Utc>,
    pub score_id: String,
    pub kind: ScoreAlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub score: i32,
    pub previous_score: Option<i32>,
}

/// Inbound request for a company's current score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequestPayload {
    #[serde(alias = "requestId")]
    pub request_id: String,
    #[serde(alias = "companyId")]
    pub company_id: String,
    #[serde(alias = "requestingService")]
    pub requesting_service: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponsePayload {
    pub request_id: String,
    pub company_id: String,
    pub timestamp: DateTime<Utc>,
    pub score: Option<CreditScore>,
    pub error: Option<String>,
}
