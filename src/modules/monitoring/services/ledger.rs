use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::period_calculator::MonitoringPeriodCalculator;
use crate::core::rounding::round2;
use crate::core::{AppError, Result};
use crate::modules::monitoring::models::{
    Alert, AlertSeverity, AlertType, HealthStatus, MonitoringInterval, MonitoringSnapshot,
    PeriodBounds, PeriodChange, PeriodCumulative, Trend,
};
use crate::modules::monitoring::repositories::SnapshotStore;
use crate::modules::scoring::models::activity::decimal_to_f64;
use crate::modules::scoring::models::ScoreComponents;

const SCORE_DROP_THRESHOLD: i32 = 10;
const SCORE_DROP_CRITICAL: i32 = 20;
const SCORE_IMPROVEMENT_THRESHOLD: i32 = 15;
const STABILITY_WARNING: f64 = 40.0;
const STABILITY_CRITICAL: f64 = 25.0;

/// Everything needed to record one period
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub company_id: String,
    pub interval: MonitoringInterval,
    pub bounds: PeriodBounds,
    pub score: i32,
    pub components: Option<ScoreComponents>,
    pub cumulative: PeriodCumulative,
    pub credit_score_id: Option<String>,
}

/// Alert flattened with the period it was raised for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAlert {
    pub snapshot_id: String,
    pub interval: MonitoringInterval,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    #[serde(flatten)]
    pub alert: Alert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalOverview {
    pub interval: MonitoringInterval,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub score: i32,
    pub health_status: HealthStatus,
    pub period_change: Option<PeriodChange>,
    pub is_critical: bool,
}

impl From<&MonitoringSnapshot> for IntervalOverview {
    fn from(snapshot: &MonitoringSnapshot) -> Self {
        Self {
            interval: snapshot.interval,
            period_start: snapshot.period_start,
            period_end: snapshot.period_end,
            score: snapshot.score,
            health_status: snapshot.health_status,
            period_change: snapshot.period_change,
            is_critical: snapshot.is_critical(),
        }
    }
}

/// Current health view combining the latest daily, weekly and monthly periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDashboard {
    pub company_id: String,
    pub current_score: i32,
    pub health_status: HealthStatus,
    pub daily: Option<IntervalOverview>,
    pub weekly: Option<IntervalOverview>,
    pub monthly: Option<IntervalOverview>,
    pub alerts: Vec<Alert>,
    pub is_critical: bool,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalTrend {
    pub interval: MonitoringInterval,
    pub score: i32,
    pub period_change: Option<PeriodChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendComparison {
    pub company_id: String,
    pub intervals: Vec<IntervalTrend>,
    /// Most frequent trend across intervals, stable on a tie
    pub overall_trend: Trend,
}

/// Compare a score with the previous period's score
pub fn period_change(previous_score: i32, score: i32) -> PeriodChange {
    let delta = score - previous_score;
    let delta_pct = if previous_score > 0 {
        round2(delta as f64 / previous_score as f64 * 100.0)
    } else {
        0.0
    };
    PeriodChange {
        previous_score,
        delta,
        delta_pct,
        trend: Trend::from_delta(delta),
    }
}

/// Alerts for a period; every rule is evaluated independently
pub fn derive_alerts(
    score: i32,
    previous_score: Option<i32>,
    components: Option<&ScoreComponents>,
    cumulative: &PeriodCumulative,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let Some(previous) = previous_score {
        if score <= previous - SCORE_DROP_THRESHOLD {
            let severity = if score <= previous - SCORE_DROP_CRITICAL {
                AlertSeverity::Critical
            } else {
                AlertSeverity::High
            };
            alerts.push(Alert {
                alert_type: AlertType::ScoreDrop,
                severity,
                message: format!(
                    "Score dropped by {} points ({} -> {})",
                    previous - score,
                    previous,
                    score
                ),
                threshold: f64::from(previous - SCORE_DROP_THRESHOLD),
                actual_value: f64::from(score),
            });
        }

        if score >= previous + SCORE_IMPROVEMENT_THRESHOLD {
            alerts.push(Alert {
                alert_type: AlertType::ScoreImprovement,
                severity: AlertSeverity::Low,
                message: format!(
                    "Score improved by {} points ({} -> {})",
                    score - previous,
                    previous,
                    score
                ),
                threshold: f64::from(previous + SCORE_IMPROVEMENT_THRESHOLD),
                actual_value: f64::from(score),
            });
        }
    }

    if cumulative.net_cash_flow < Decimal::ZERO {
        let half_inflows = cumulative.total_inflows / Decimal::from(2);
        let severity = if cumulative.net_cash_flow.abs() > half_inflows {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Medium
        };
        alerts.push(Alert {
            alert_type: AlertType::CashFlowAlert,
            severity,
            message: format!("Negative net cash flow of {}", cumulative.net_cash_flow),
            threshold: 0.0,
            actual_value: decimal_to_f64(cumulative.net_cash_flow),
        });
    }

    if let Some(stability) = components.map(|c| c.business_stability) {
        if stability < STABILITY_WARNING {
            let severity = if stability < STABILITY_CRITICAL {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Medium
            };
            alerts.push(Alert {
                alert_type: AlertType::StabilityWarning,
                severity,
                message: format!("Business stability at {:.0}/100", stability),
                threshold: STABILITY_WARNING,
                actual_value: stability,
            });
        }
    }

    alerts
}

/// `now` minus `days`, rejecting windows outside the representable calendar
fn days_before(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| AppError::validation(format!("Window of {} days is out of range", days)))
}

/// Rolling per-interval monitoring ledger
pub struct MonitoringLedger {
    store: Arc<dyn SnapshotStore>,
}

impl MonitoringLedger {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Store the snapshot of one period, comparing it with the preceding period
    ///
    /// # Errors
    /// * `Validation` - bounds not aligned to the interval, or score outside 1-100
    pub async fn record_snapshot(&self, input: NewSnapshot) -> Result<MonitoringSnapshot> {
        let aligned = MonitoringPeriodCalculator::bounds(input.interval, input.bounds.start);
        if aligned != input.bounds {
            return Err(AppError::validation(format!(
                "Period [{}, {}] is not a {} period",
                input.bounds.start, input.bounds.end, input.interval
            )));
        }
        if !(1..=100).contains(&input.score) {
            return Err(AppError::validation(format!(
                "Score {} outside 1-100",
                input.score
            )));
        }

        let previous_bounds =
            MonitoringPeriodCalculator::previous_bounds(input.interval, input.bounds.start);
        let previous = self
            .store
            .find_by_period(&input.company_id, input.interval, previous_bounds.start)
            .await?;
        let previous_score = previous.as_ref().map(|p| p.score);

        let alerts = derive_alerts(
            input.score,
            previous_score,
            input.components.as_ref(),
            &input.cumulative,
        );

        let snapshot = MonitoringSnapshot {
            id: MonitoringSnapshot::new_id(),
            company_id: input.company_id,
            interval: input.interval,
            period_start: input.bounds.start,
            period_end: input.bounds.end,
            score: input.score,
            health_status: HealthStatus::from_score(input.score),
            period_cumulative: input.cumulative,
            score_components: input.components,
            period_change: previous_score.map(|p| period_change(p, input.score)),
            alerts,
            credit_score_id: input.credit_score_id,
            created_at: Utc::now(),
        };

        let stored = self.store.upsert(&snapshot).await?;

        if stored.is_critical() {
            warn!(
                company_id = %stored.company_id,
                interval = %stored.interval,
                score = stored.score,
                alerts = stored.alerts.len(),
                "Critical monitoring snapshot recorded"
            );
        } else {
            info!(
                company_id = %stored.company_id,
                interval = %stored.interval,
                score = stored.score,
                trend = ?stored.trend(),
                "Monitoring snapshot recorded"
            );
        }

        Ok(stored)
    }

    /// Snapshots of the last `window_days`, oldest first
    pub async fn history(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
        window_days: i64,
    ) -> Result<Vec<MonitoringSnapshot>> {
        self.history_at(company_id, interval, window_days, Utc::now())
            .await
    }

    pub async fn history_at(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<MonitoringSnapshot>> {
        if window_days <= 0 {
            return Err(AppError::validation("History window must be positive"));
        }
        let from = days_before(now, window_days)?;
        self.store.find_range(company_id, interval, from, now).await
    }

    pub async fn latest(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
    ) -> Result<Option<MonitoringSnapshot>> {
        self.store.find_latest(company_id, interval).await
    }

    /// Alerts of every interval recorded within the lookback, newest period first
    ///
    /// Selection is by recording time, so a monthly or yearly period that
    /// started before the lookback still reports its current alerts.
    pub async fn active_alerts(
        &self,
        company_id: &str,
        lookback_days: i64,
    ) -> Result<Vec<ActiveAlert>> {
        self.active_alerts_at(company_id, lookback_days, Utc::now())
            .await
    }

    pub async fn active_alerts_at(
        &self,
        company_id: &str,
        lookback_days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActiveAlert>> {
        if lookback_days <= 0 {
            return Err(AppError::validation("Alert lookback must be positive"));
        }

        let since = days_before(now, lookback_days)?;
        let mut snapshots = self.store.recorded_since(company_id, since).await?;
        snapshots.sort_by(|a, b| {
            b.period_start
                .cmp(&a.period_start)
                .then(b.created_at.cmp(&a.created_at))
        });

        Ok(snapshots
            .into_iter()
            .flat_map(|snapshot| {
                let MonitoringSnapshot {
                    id,
                    interval,
                    period_start,
                    period_end,
                    alerts,
                    ..
                } = snapshot;
                alerts.into_iter().map(move |alert| ActiveAlert {
                    snapshot_id: id.clone(),
                    interval,
                    period_start,
                    period_end,
                    alert,
                })
            })
            .collect())
    }

    /// # Errors
    /// * `NotFound` - no daily, weekly or monthly snapshot exists yet
    pub async fn dashboard(&self, company_id: &str) -> Result<HealthDashboard> {
        let daily = self.latest(company_id, MonitoringInterval::Daily).await?;
        let weekly = self.latest(company_id, MonitoringInterval::Weekly).await?;
        let monthly = self.latest(company_id, MonitoringInterval::Monthly).await?;

        let current = daily
            .as_ref()
            .or(weekly.as_ref())
            .or(monthly.as_ref())
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "No monitoring data for company '{}'",
                    company_id
                ))
            })?;

        let present: Vec<&MonitoringSnapshot> = [&daily, &weekly, &monthly]
            .into_iter()
            .filter_map(Option::as_ref)
            .collect();

        let mut alerts: Vec<Alert> = Vec::new();
        for snapshot in &present {
            for alert in &snapshot.alerts {
                if !alerts.contains(alert) {
                    alerts.push(alert.clone());
                }
            }
        }

        Ok(HealthDashboard {
            company_id: company_id.to_string(),
            current_score: current.score,
            health_status: current.health_status,
            is_critical: present.iter().any(|s| s.is_critical()),
            daily: daily.as_ref().map(IntervalOverview::from),
            weekly: weekly.as_ref().map(IntervalOverview::from),
            monthly: monthly.as_ref().map(IntervalOverview::from),
            alerts,
            generated_at: Utc::now(),
        })
    }

    /// Latest period change of every interval that has data
    pub async fn trend_comparison(&self, company_id: &str) -> Result<TrendComparison> {
        let mut intervals = Vec::new();
        for interval in MonitoringInterval::ALL {
            if let Some(snapshot) = self.latest(company_id, interval).await? {
                intervals.push(IntervalTrend {
                    interval,
                    score: snapshot.score,
                    period_change: snapshot.period_change,
                });
            }
        }

        if intervals.is_empty() {
            return Err(AppError::not_found(format!(
                "No monitoring data for company '{}'",
                company_id
            )));
        }

        let count = |trend: Trend| {
            intervals
                .iter()
                .filter(|i| i.period_change.map(|c| c.trend) == Some(trend))
                .count()
        };
        let improving = count(Trend::Improving);
        let declining = count(Trend::Declining);
        let stable = count(Trend::Stable);
        let overall_trend = if improving > declining && improving > stable {
            Trend::Improving
        } else if declining > improving && declining > stable {
            Trend::Declining
        } else {
            Trend::Stable
        };

        Ok(TrendComparison {
            company_id: company_id.to_string(),
            intervals,
            overall_trend,
        })
    }
}
