use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

use super::score_engine::ScoreComputationEngine;
use crate::core::Result;
use crate::modules::events::models::topics::CREDIT_SCORE_EXPIRED;
use crate::modules::events::models::ScoreExpiredPayload;
use crate::modules::events::services::{
    DeferredJob, DeferredPublisher, DistributionResult, EventDistributor,
};
use crate::modules::scoring::models::{CreditScore, ScoringMethod};
use crate::modules::scoring::repositories::CreditScoreStore;

/// Result of one calculation; `distribution` is `None` when it was deferred
#[derive(Debug, Clone)]
pub struct CalculationOutcome {
    pub score: CreditScore,
    pub distribution: Option<DistributionResult>,
}

/// Calculate, persist and announce credit scores
pub struct CreditScoreService {
    engine: Arc<ScoreComputationEngine>,
    scores: Arc<dyn CreditScoreStore>,
    distributor: Arc<EventDistributor>,
    deferred: Option<DeferredPublisher>,
}

impl CreditScoreService {
    pub fn new(
        engine: Arc<ScoreComputationEngine>,
        scores: Arc<dyn CreditScoreStore>,
        distributor: Arc<EventDistributor>,
    ) -> Self {
        Self {
            engine,
            scores,
            distributor,
            deferred: None,
        }
    }

    pub fn with_deferred(mut self, deferred: DeferredPublisher) -> Self {
        self.deferred = Some(deferred);
        self
    }

    /// Compute and persist, then distribute before returning
    pub async fn calculate(
        &self,
        company_id: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        method: ScoringMethod,
    ) -> Result<CalculationOutcome> {
        let (score, previous) = self
            .compute_and_store(company_id, period_start, period_end, method)
            .await?;

        let distribution = self
            .distributor
            .distribute_credit_score(&score, previous.as_ref())
            .await;

        Ok(CalculationOutcome {
            score,
            distribution: Some(distribution),
        })
    }

    /// Compute and persist; distribution runs after the caller has its answer
    ///
    /// A rejected deferred job is logged. The persisted score is still returned.
    pub async fn calculate_deferred(
        &self,
        company_id: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        method: ScoringMethod,
    ) -> Result<CalculationOutcome> {
        let Some(deferred) = &self.deferred else {
            return self
                .calculate(company_id, period_start, period_end, method)
                .await;
        };

        let (score, previous) = self
            .compute_and_store(company_id, period_start, period_end, method)
            .await?;

        if let Err(e) = deferred.enqueue(DeferredJob::DistributeScore {
            score: score.clone(),
            previous,
        }) {
            error!(
                company_id = %company_id,
                score_id = %score.id,
                error = %e,
                "Score distribution could not be deferred"
            );
        }

        Ok(CalculationOutcome {
            score,
            distribution: None,
        })
    }

    async fn compute_and_store(
        &self,
        company_id: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        method: ScoringMethod,
    ) -> Result<(CreditScore, Option<CreditScore>)> {
        let previous = self.scores.find_latest(company_id).await?;
        let computed = self
            .engine
            .compute(company_id, period_start, period_end, method)
            .await?
            .with_previous(previous.as_ref());

        let saved = self.scores.save(&computed).await?;

        info!(
            company_id = %company_id,
            score_id = %saved.id,
            score = saved.score,
            method = %saved.method,
            "Credit score stored"
        );

        Ok((saved, previous))
    }

    pub async fn latest(&self, company_id: &str) -> Result<Option<CreditScore>> {
        self.scores.find_latest(company_id).await
    }

    /// Announce every score whose validity ended, once each
    ///
    /// Returns the number of expiry events published.
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> Result<usize> {
        let expired = self.scores.find_unannounced_expired(now).await?;
        let mut announced = 0;

        for score in expired {
            let payload = ScoreExpiredPayload {
                company_id: score.company_id.clone(),
                timestamp: now,
                score_id: score.id.clone(),
                score: score.score,
                valid_until: score.valid_until,
            };

            match self
                .distributor
                .publish(CREDIT_SCORE_EXPIRED, &payload, "Credit score expired")
                .await
            {
                Ok(_) => {
                    self.scores.mark_expiry_announced(&score.id).await?;
                    announced += 1;
                }
                Err(e) => {
                    warn!(
                        company_id = %score.company_id,
                        score_id = %score.id,
                        error = %e,
                        "Expiry event not published"
                    );
                }
            }
        }

        Ok(announced)
    }

    /// Periodically run `expire_stale`; spawn as a tokio task
    pub async fn start_expiry_sweep(self: Arc<Self>, every: Duration) {
        info!(every_secs = every.as_secs(), "Starting credit score expiry sweep");
        let mut ticker = interval(every);

        loop {
            ticker.tick().await;
            match self.expire_stale(Utc::now()).await {
                Ok(count) if count > 0 => info!(count, "Expired credit scores announced"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Credit score expiry sweep failed"),
            }
        }
    }
}
