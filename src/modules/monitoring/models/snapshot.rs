use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::scoring::models::{ActivitySummary, ScoreComponents};

/// Monitoring granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringInterval {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl MonitoringInterval {
    pub const ALL: [MonitoringInterval; 5] = [
        MonitoringInterval::Daily,
        MonitoringInterval::Weekly,
        MonitoringInterval::Monthly,
        MonitoringInterval::Quarterly,
        MonitoringInterval::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitoringInterval::Daily => "daily",
            MonitoringInterval::Weekly => "weekly",
            MonitoringInterval::Monthly => "monthly",
            MonitoringInterval::Quarterly => "quarterly",
            MonitoringInterval::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for MonitoringInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MonitoringInterval {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(MonitoringInterval::Daily),
            "weekly" => Ok(MonitoringInterval::Weekly),
            "monthly" => Ok(MonitoringInterval::Monthly),
            "quarterly" => Ok(MonitoringInterval::Quarterly),
            "yearly" => Ok(MonitoringInterval::Yearly),
            other => Err(format!("Invalid monitoring interval: {}", other)),
        }
    }
}

/// Five-tier bucket derived from a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 91 => HealthStatus::Excellent,
            s if s >= 71 => HealthStatus::Good,
            s if s >= 51 => HealthStatus::Fair,
            s if s >= 31 => HealthStatus::Poor,
            _ => HealthStatus::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Fair => "fair",
            HealthStatus::Poor => "poor",
            HealthStatus::Critical => "critical",
        }
    }
}

impl std::str::FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "excellent" => Ok(HealthStatus::Excellent),
            "good" => Ok(HealthStatus::Good),
            "fair" => Ok(HealthStatus::Fair),
            "poor" => Ok(HealthStatus::Poor),
            "critical" => Ok(HealthStatus::Critical),
            other => Err(format!("Invalid health status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    /// Deltas below this magnitude are considered noise
    pub const STABLE_BAND: i32 = 3;

    pub fn from_delta(delta: i32) -> Self {
        if delta.abs() < Self::STABLE_BAND {
            Trend::Stable
        } else if delta > 0 {
            Trend::Improving
        } else {
            Trend::Declining
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ScoreDrop,
    ScoreImprovement,
    CashFlowAlert,
    StabilityWarning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Alert attached to exactly one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub threshold: f64,
    pub actual_value: f64,
}

/// Aggregated cash activity of one monitoring window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodCumulative {
    pub total_inflows: Decimal,
    pub total_outflows: Decimal,
    pub net_cash_flow: Decimal,
    pub transaction_count: i64,
    pub avg_transaction_size: Decimal,
    pub avg_balance: Decimal,
}

impl From<&ActivitySummary> for PeriodCumulative {
    fn from(activity: &ActivitySummary) -> Self {
        Self {
            total_inflows: activity.total_inflows,
            total_outflows: activity.total_outflows,
            net_cash_flow: activity.net_cash_flow(),
            transaction_count: activity.transaction_count,
            avg_transaction_size: activity.avg_transaction_size(),
            avg_balance: activity.avg_balance,
        }
    }
}

/// Comparison against the immediately preceding period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodChange {
    pub previous_score: i32,
    pub delta: i32,
    pub delta_pct: f64,
    pub trend: Trend,
}

/// Inclusive `[start, end]` window of one period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One persisted monitoring record per (company, interval, period_start)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    pub id: String,
    pub company_id: String,
    pub interval: MonitoringInterval,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub score: i32,
    pub health_status: HealthStatus,
    pub period_cumulative: PeriodCumulative,
    pub score_components: Option<ScoreComponents>,
    pub period_change: Option<PeriodChange>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    pub credit_score_id: Option<String>,
    /// When the period was last recorded
    pub created_at: DateTime<Utc>,
}

impl MonitoringSnapshot {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn bounds(&self) -> PeriodBounds {
        PeriodBounds {
            start: self.period_start,
            end: self.period_end,
        }
    }

    /// Critical health or at least one critical alert
    pub fn is_critical(&self) -> bool {
        self.health_status == HealthStatus::Critical
            || self
                .alerts
                .iter()
                .any(|a| a.severity == AlertSeverity::Critical)
    }

    pub fn trend(&self) -> Option<Trend> {
        self.period_change.map(|c| c.trend)
    }
}
