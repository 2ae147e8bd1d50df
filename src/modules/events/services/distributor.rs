use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::event_bus::EventBus;
use super::metrics::PublishMetrics;
use crate::core::{AppError, Result};
use crate::modules::events::models::topics::{
    CREDIT_SCORE_CALCULATED, CREDIT_SCORE_MONITORING_ALERT, CREDIT_SCORE_UPDATED,
};
use crate::modules::events::models::{
    resolve_topic, DomainEvent, ScoreAlertKind, ScoreAlertPayload, ScoreCalculatedPayload,
    ScoreUpdatedPayload,
};
use crate::modules::monitoring::models::AlertSeverity;
use crate::modules::scoring::models::CreditScore;
use crate::modules::scoring::repositories::CreditScoreStore;

/// Scores below this are announced as critical
pub const CRITICAL_SCORE_THRESHOLD: i32 = 30;
/// Point drop against the previous score that raises a degradation alert
pub const DEGRADATION_THRESHOLD: i32 = 20;
/// Validity remaining, in days, under which an expiry warning is raised
pub const EXPIRY_WARNING_DAYS: i64 = 7;

/// Per-step outcome of distributing one credit score
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistributionResult {
    /// False when the primary publish or the distributed marker failed
    pub success: bool,
    pub score_id: String,
    pub published_topics: Vec<String>,
    pub alerts_published: usize,
    pub marked_distributed: bool,
    pub errors: Vec<String>,
}

/// Threshold alerts raised by a new score, in evaluation order
pub fn threshold_alerts(
    score: &CreditScore,
    previous: Option<&CreditScore>,
    now: DateTime<Utc>,
) -> Vec<ScoreAlertPayload> {
    let previous_score = previous.map(|p| p.score);
    let alert = |kind, severity, message: String| ScoreAlertPayload {
        company_id: score.company_id.clone(),
        timestamp: now,
        score_id: score.id.clone(),
        kind,
        severity,
        message,
        score: score.score,
        previous_score,
    };

    let mut alerts = Vec::new();

    if score.score < CRITICAL_SCORE_THRESHOLD {
        alerts.push(alert(
            ScoreAlertKind::CriticalScore,
            AlertSeverity::Critical,
            format!(
                "Credit score {} is below the critical threshold of {}",
                score.score, CRITICAL_SCORE_THRESHOLD
            ),
        ));
    }

    if let Some(prev) = previous {
        let drop = prev.score - score.score;
        if drop > DEGRADATION_THRESHOLD {
            alerts.push(alert(
                ScoreAlertKind::ScoreDegradation,
                AlertSeverity::High,
                format!(
                    "Credit score dropped by {} points ({} -> {})",
                    drop, prev.score, score.score
                ),
            ));
        }

        if prev.risk_level != score.risk_level {
            alerts.push(alert(
                ScoreAlertKind::RiskLevelChange,
                AlertSeverity::Medium,
                format!(
                    "Risk level changed from {} to {}",
                    prev.risk_level.as_str(),
                    score.risk_level.as_str()
                ),
            ));
        }
    }

    if score.expires_within(now, Duration::days(EXPIRY_WARNING_DAYS)) {
        alerts.push(alert(
            ScoreAlertKind::ExpiringSoon,
            AlertSeverity::Low,
            format!("Credit score expires at {}", score.valid_until.to_rfc3339()),
        ));
    }

    alerts
}

/// Publishes score lifecycle events through the bus port
pub struct EventDistributor {
    bus: Arc<dyn EventBus>,
    scores: Arc<dyn CreditScoreStore>,
    service_name: String,
    schema_version: String,
    metrics: Arc<PublishMetrics>,
}

impl EventDistributor {
    pub fn new(
        bus: Arc<dyn EventBus>,
        scores: Arc<dyn CreditScoreStore>,
        service_name: impl Into<String>,
        schema_version: impl Into<String>,
        metrics: Arc<PublishMetrics>,
    ) -> Self {
        Self {
            bus,
            scores,
            service_name: service_name.into(),
            schema_version: schema_version.into(),
            metrics,
        }
    }

    pub fn metrics(&self) -> Arc<PublishMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Wrap and dispatch one payload
    ///
    /// `topic` may be a legacy alias. Failures are logged, counted and returned.
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        payload: &T,
        description: &str,
    ) -> Result<DomainEvent> {
        let canonical = resolve_topic(topic);
        let body = serde_json::to_value(payload)?;
        let event = DomainEvent::wrap(
            canonical,
            body,
            &self.service_name,
            &self.schema_version,
            description,
        );

        let started = Instant::now();
        match self.bus.publish(&event).await {
            Ok(()) => {
                let latency = started.elapsed();
                self.metrics.record_success(latency);
                info!(
                    topic = %event.topic,
                    event_id = %event.event_id,
                    latency_ms = latency.as_secs_f64() * 1000.0,
                    "Event distributed"
                );
                Ok(event)
            }
            Err(e) => {
                self.metrics.record_failure();
                error!(
                    topic = %event.topic,
                    event_id = %event.event_id,
                    error = %e,
                    "Event distribution failed"
                );
                Err(match e {
                    AppError::Distribution(_) => e,
                    other => AppError::Distribution(other.to_string()),
                })
            }
        }
    }

    pub async fn distribute_credit_score(
        &self,
        score: &CreditScore,
        previous: Option<&CreditScore>,
    ) -> DistributionResult {
        self.distribute_credit_score_at(score, previous, Utc::now())
            .await
    }

    /// Publish calculated-or-updated, then threshold alerts, then mark distributed
    ///
    /// Every step is attempted regardless of earlier failures.
    pub async fn distribute_credit_score_at(
        &self,
        score: &CreditScore,
        previous: Option<&CreditScore>,
        now: DateTime<Utc>,
    ) -> DistributionResult {
        let mut result = DistributionResult {
            score_id: score.id.clone(),
            ..DistributionResult::default()
        };

        let primary = match previous {
            None => {
                let payload = ScoreCalculatedPayload {
                    company_id: score.company_id.clone(),
                    timestamp: now,
                    score: score.clone(),
                };
                self.publish(CREDIT_SCORE_CALCULATED, &payload, "Credit score calculated")
                    .await
            }
            Some(prev) => {
                let payload = ScoreUpdatedPayload {
                    company_id: score.company_id.clone(),
                    timestamp: now,
                    previous_score: prev.score,
                    new_score: score.score,
                    previous_risk_level: prev.risk_level,
                    score: score.clone(),
                };
                self.publish(CREDIT_SCORE_UPDATED, &payload, "Credit score updated")
                    .await
            }
        };

        let primary_ok = match primary {
            Ok(event) => {
                result.published_topics.push(event.topic);
                true
            }
            Err(e) => {
                result.errors.push(format!("primary publish: {}", e));
                false
            }
        };

        for alert in threshold_alerts(score, previous, now) {
            match self
                .publish(CREDIT_SCORE_MONITORING_ALERT, &alert, &alert.message)
                .await
            {
                Ok(event) => {
                    result.alerts_published += 1;
                    if !result.published_topics.contains(&event.topic) {
                        result.published_topics.push(event.topic);
                    }
                }
                Err(e) => {
                    warn!(
                        company_id = %score.company_id,
                        score_id = %score.id,
                        error = %e,
                        "Score alert could not be published"
                    );
                    result.errors.push(format!("alert publish: {}", e));
                }
            }
        }

        match self.scores.mark_distributed(&score.id).await {
            Ok(()) => result.marked_distributed = true,
            Err(e) => {
                warn!(score_id = %score.id, error = %e, "Could not mark score as distributed");
                result.errors.push(format!("mark distributed: {}", e));
            }
        }

        result.success = primary_ok && result.marked_distributed;

        info!(
            company_id = %score.company_id,
            score_id = %score.id,
            success = result.success,
            alerts = result.alerts_published,
            errors = result.errors.len(),
            "Credit score distribution finished"
        );

        result
    }
}
