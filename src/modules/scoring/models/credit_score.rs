use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::rounding::round2;

/// A computed score stays valid for this many days
pub const VALIDITY_DAYS: i64 = 30;

/// Scoring strategy requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    Traditional,
    Ml,
    Hybrid,
}

impl Default for ScoringMethod {
    fn default() -> Self {
        ScoringMethod::Hybrid
    }
}

impl std::fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringMethod::Traditional => write!(f, "traditional"),
            ScoringMethod::Ml => write!(f, "ml"),
            ScoringMethod::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl std::str::FromStr for ScoringMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "traditional" => Ok(ScoringMethod::Traditional),
            "ml" => Ok(ScoringMethod::Ml),
            "hybrid" => Ok(ScoringMethod::Hybrid),
            other => Err(format!("Invalid scoring method: {}", other)),
        }
    }
}

/// Coarse risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 70 => RiskLevel::Low,
            s if s >= 40 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            other => Err(format!("Invalid risk level: {}", other)),
        }
    }
}

/// Finer-grained score class, A being the best
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreClass {
    A,
    B,
    C,
    D,
    E,
}

impl ScoreClass {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 85 => ScoreClass::A,
            s if s >= 70 => ScoreClass::B,
            s if s >= 55 => ScoreClass::C,
            s if s >= 40 => ScoreClass::D,
            _ => ScoreClass::E,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreClass::A => "A",
            ScoreClass::B => "B",
            ScoreClass::C => "C",
            ScoreClass::D => "D",
            ScoreClass::E => "E",
        }
    }
}

impl std::str::FromStr for ScoreClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(ScoreClass::A),
            "B" => Ok(ScoreClass::B),
            "C" => Ok(ScoreClass::C),
            "D" => Ok(ScoreClass::D),
            "E" => Ok(ScoreClass::E),
            other => Err(format!("Invalid score class: {}", other)),
        }
    }
}

/// How much data backed the computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl DataQuality {
    /// Same thresholds as the traditional confidence step function
    pub fn from_transaction_count(count: i64) -> Self {
        match count {
            c if c > 100 => DataQuality::Excellent,
            c if c > 50 => DataQuality::Good,
            c if c > 20 => DataQuality::Fair,
            _ => DataQuality::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::Excellent => "excellent",
            DataQuality::Good => "good",
            DataQuality::Fair => "fair",
            DataQuality::Poor => "poor",
        }
    }
}

impl std::str::FromStr for DataQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "excellent" => Ok(DataQuality::Excellent),
            "good" => Ok(DataQuality::Good),
            "fair" => Ok(DataQuality::Fair),
            "poor" => Ok(DataQuality::Poor),
            other => Err(format!("Invalid data quality: {}", other)),
        }
    }
}

/// Names the five sub-scores of [`ScoreComponents`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreComponent {
    CashFlowQuality,
    BusinessStability,
    FinancialHealth,
    PaymentBehavior,
    GrowthTrend,
}

impl ScoreComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreComponent::CashFlowQuality => "cash_flow_quality",
            ScoreComponent::BusinessStability => "business_stability",
            ScoreComponent::FinancialHealth => "financial_health",
            ScoreComponent::PaymentBehavior => "payment_behavior",
            ScoreComponent::GrowthTrend => "growth_trend",
        }
    }

    /// Human-readable name used in explanations
    pub fn label(&self) -> &'static str {
        match self {
            ScoreComponent::CashFlowQuality => "cash flow quality",
            ScoreComponent::BusinessStability => "business stability",
            ScoreComponent::FinancialHealth => "financial health",
            ScoreComponent::PaymentBehavior => "payment behavior",
            ScoreComponent::GrowthTrend => "growth trend",
        }
    }
}

/// The five weighted sub-scores, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub cash_flow_quality: f64,
    pub business_stability: f64,
    pub financial_health: f64,
    pub payment_behavior: f64,
    pub growth_trend: f64,
}

impl ScoreComponents {
    pub const CASH_FLOW_WEIGHT: f64 = 0.25;
    pub const STABILITY_WEIGHT: f64 = 0.20;
    pub const HEALTH_WEIGHT: f64 = 0.25;
    pub const PAYMENT_WEIGHT: f64 = 0.20;
    pub const GROWTH_WEIGHT: f64 = 0.10;

    /// Unrounded weighted sum of the components
    pub fn weighted_sum(&self) -> f64 {
        self.cash_flow_quality * Self::CASH_FLOW_WEIGHT
            + self.business_stability * Self::STABILITY_WEIGHT
            + self.financial_health * Self::HEALTH_WEIGHT
            + self.payment_behavior * Self::PAYMENT_WEIGHT
            + self.growth_trend * Self::GROWTH_WEIGHT
    }

    /// Named view used for explanations and recommendations
    pub fn named(&self) -> [(ScoreComponent, f64); 5] {
        [
            (ScoreComponent::CashFlowQuality, self.cash_flow_quality),
            (ScoreComponent::BusinessStability, self.business_stability),
            (ScoreComponent::FinancialHealth, self.financial_health),
            (ScoreComponent::PaymentBehavior, self.payment_behavior),
            (ScoreComponent::GrowthTrend, self.growth_trend),
        ]
    }
}

/// Movement relative to the previous score of the same company
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub previous_score: i32,
    pub delta: i32,
    pub delta_pct: f64,
}

impl ScoreChange {
    pub fn between(previous_score: i32, current_score: i32) -> Self {
        let delta = current_score - previous_score;
        let delta_pct = if previous_score > 0 {
            round2(delta as f64 / previous_score as f64 * 100.0)
        } else {
            0.0
        };
        Self {
            previous_score,
            delta,
            delta_pct,
        }
    }
}

/// One computed creditworthiness assessment
///
/// Superseded by the next calculation for the same company; only the
/// `distributed` marker is ever updated after persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditScore {
    pub id: String,
    pub company_id: String,
    pub score: i32,
    pub risk_level: RiskLevel,
    pub score_class: ScoreClass,
    pub calculated_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub model_version: String,
    pub data_source: String,
    pub confidence_score: f64,
    pub data_quality: DataQuality,
    pub method: ScoringMethod,
    pub components: Option<ScoreComponents>,
    #[serde(default)]
    pub explanations: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub score_change: Option<ScoreChange>,
    #[serde(default)]
    pub distributed: bool,
}

impl CreditScore {
    /// Build a fresh record; tiers and validity window are derived here
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        company_id: impl Into<String>,
        score: i32,
        confidence_score: f64,
        data_quality: DataQuality,
        method: ScoringMethod,
        model_version: impl Into<String>,
        data_source: impl Into<String>,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        let score = score.clamp(1, 100);
        Self {
            id: Uuid::new_v4().to_string(),
            company_id: company_id.into(),
            score,
            risk_level: RiskLevel::from_score(score),
            score_class: ScoreClass::from_score(score),
            calculated_at,
            valid_until: calculated_at + Duration::days(VALIDITY_DAYS),
            model_version: model_version.into(),
            data_source: data_source.into(),
            confidence_score: confidence_score.clamp(0.0, 1.0),
            data_quality,
            method,
            components: None,
            explanations: Vec::new(),
            recommendations: Vec::new(),
            score_change: None,
            distributed: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_until
    }

    /// True when the score is still valid but ends within `window`
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        !self.is_expired(now) && self.valid_until - now <= window
    }

    /// Attach the movement against the previously stored score
    pub fn with_previous(mut self, previous: Option<&CreditScore>) -> Self {
        self.score_change = previous.map(|p| ScoreChange::between(p.score, self.score));
        self
    }
}
