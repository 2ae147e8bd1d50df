use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

use super::ledger::{MonitoringLedger, NewSnapshot};
use super::period_calculator::MonitoringPeriodCalculator;
use crate::core::Result;
use crate::modules::monitoring::models::{MonitoringInterval, MonitoringSnapshot, PeriodCumulative};
use crate::modules::monitoring::repositories::MonitoredCompanies;
use crate::modules::scoring::models::ScoringMethod;
use crate::modules::scoring::repositories::{AccountingDataSource, CreditScoreStore};
use crate::modules::scoring::services::ScoreComputationEngine;

/// Outcome of one interval tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub interval: Option<MonitoringInterval>,
    pub recorded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Drives the scoring pipeline for every monitored company
///
/// Companies are processed sequentially; a failure for one company is logged
/// and does not stop the tick.
pub struct MonitoringScheduler {
    companies: Arc<dyn MonitoredCompanies>,
    accounting: Arc<dyn AccountingDataSource>,
    engine: Arc<ScoreComputationEngine>,
    scores: Arc<dyn CreditScoreStore>,
    ledger: Arc<MonitoringLedger>,
    method: ScoringMethod,
}

impl MonitoringScheduler {
    pub fn new(
        companies: Arc<dyn MonitoredCompanies>,
        accounting: Arc<dyn AccountingDataSource>,
        engine: Arc<ScoreComputationEngine>,
        scores: Arc<dyn CreditScoreStore>,
        ledger: Arc<MonitoringLedger>,
        method: ScoringMethod,
    ) -> Self {
        Self {
            companies,
            accounting,
            engine,
            scores,
            ledger,
            method,
        }
    }

    /// Periodically run `monitoring_interval` ticks; spawn as a tokio task
    pub async fn start(self: Arc<Self>, monitoring_interval: MonitoringInterval, every: Duration) {
        info!(
            interval = %monitoring_interval,
            every_secs = every.as_secs(),
            "Starting credit monitoring scheduler"
        );

        let mut ticker = interval(every);

        loop {
            ticker.tick().await;

            match self.run_tick(monitoring_interval, Utc::now()).await {
                Ok(report) => {
                    info!(
                        interval = %monitoring_interval,
                        recorded = report.recorded.len(),
                        failed = report.failed.len(),
                        "Monitoring tick completed"
                    );
                }
                Err(e) => {
                    error!(
                        interval = %monitoring_interval,
                        error = %e,
                        "Monitoring tick could not list companies"
                    );
                }
            }
        }
    }

    /// Record the period containing `now` for every monitored company
    ///
    /// Only listing the companies can fail the whole tick.
    pub async fn run_tick(
        &self,
        monitoring_interval: MonitoringInterval,
        now: DateTime<Utc>,
    ) -> Result<TickReport> {
        let companies = self.companies.list_monitored().await?;
        let mut report = TickReport {
            interval: Some(monitoring_interval),
            ..TickReport::default()
        };

        for company_id in companies {
            match self.monitor_company(&company_id, monitoring_interval, now).await {
                Ok(snapshot) => report.recorded.push(snapshot.company_id),
                Err(e) => {
                    error!(
                        company_id = %company_id,
                        interval = %monitoring_interval,
                        error = %e,
                        "Monitoring failed for company"
                    );
                    report.failed.push((company_id, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Score one company for the current period and record the snapshot
    pub async fn monitor_company(
        &self,
        company_id: &str,
        monitoring_interval: MonitoringInterval,
        now: DateTime<Utc>,
    ) -> Result<MonitoringSnapshot> {
        let bounds = MonitoringPeriodCalculator::bounds(monitoring_interval, now);

        let score = self
            .engine
            .compute(company_id, bounds.start, bounds.end, self.method)
            .await?;
        let score = self.scores.save(&score).await?;

        let activity = self
            .accounting
            .period_activity(company_id, bounds.start, bounds.end)
            .await?;

        self.ledger
            .record_snapshot(NewSnapshot {
                company_id: company_id.to_string(),
                interval: monitoring_interval,
                bounds,
                score: score.score,
                components: score.components,
                cumulative: PeriodCumulative::from(&activity),
                credit_score_id: Some(score.id),
            })
            .await
    }
}
