use chrono::{DateTime, Utc};
use futures_util::future::join;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::features::MlScoringRequest;
use super::ml_client::ExternalScoringClient;
use crate::core::rounding::{clamp_component, clamp_score};
use crate::core::{AppError, Result};
use crate::modules::scoring::models::activity::decimal_to_f64;
use crate::modules::scoring::models::{
    ActivitySummary, CreditScore, DataQuality, ScoreComponent, ScoreComponents, ScoringMethod,
};
use crate::modules::scoring::repositories::AccountingDataSource;

pub const TRADITIONAL_MODEL_VERSION: &str = "traditional-v1.0";
pub const HYBRID_MODEL_VERSION: &str = "hybrid-v1.0";

const ACCOUNTING_SOURCE: &str = "accounting";
const ML_SOURCE: &str = "ml-scoring-service";

/// Weights of the hybrid merge when both strategies succeed
const HYBRID_TRADITIONAL_WEIGHT: f64 = 0.4;
const HYBRID_ML_WEIGHT: f64 = 0.6;
/// Confidence penalty when only one hybrid branch succeeded
const DEGRADED_CONFIDENCE_FACTOR: f64 = 0.8;

/// Fixed analytical sub-routine values of the rule-based method
///
/// These stand in for regularity, outflow control, variability, debt ratio,
/// punctuality and growth analyses until real business rules exist. Each is
/// a 0-100 heuristic (debt ratio is a 0-1 share, growth a percentage).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraditionalHeuristics {
    pub inflow_regularity: f64,
    pub outflow_control: f64,
    pub revenue_variability: f64,
    pub debt_ratio: f64,
    pub payment_punctuality: f64,
    pub growth_rate_pct: f64,
}

impl Default for TraditionalHeuristics {
    fn default() -> Self {
        Self {
            inflow_regularity: 75.0,
            outflow_control: 70.0,
            revenue_variability: 30.0,
            debt_ratio: 0.35,
            payment_punctuality: 80.0,
            growth_rate_pct: 5.0,
        }
    }
}

/// Intermediate result of one scoring strategy, before it becomes a record
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub method: ScoringMethod,
    pub score: i32,
    pub confidence: f64,
    pub data_quality: DataQuality,
    pub components: Option<ScoreComponents>,
    pub model_version: String,
    pub data_source: String,
    pub explanations: Vec<String>,
    pub recommendations: Vec<String>,
}

impl StrategyOutcome {
    fn into_credit_score(self, company_id: &str, calculated_at: DateTime<Utc>) -> CreditScore {
        let mut record = CreditScore::new(
            company_id,
            self.score,
            self.confidence,
            self.data_quality,
            self.method,
            self.model_version,
            self.data_source,
            calculated_at,
        );
        record.components = self.components;
        record.explanations = self.explanations;
        record.recommendations = self.recommendations;
        record
    }
}

/// Confidence step function of the rule-based method
pub fn traditional_confidence(transaction_count: i64) -> f64 {
    match transaction_count {
        c if c > 100 => 0.95,
        c if c > 50 => 0.85,
        c if c > 20 => 0.75,
        _ => 0.65,
    }
}

/// Computes credit scores with the traditional, ML or hybrid strategy
///
/// Side-effect free apart from the accounting read and the ML call; the
/// caller persists the returned record.
pub struct ScoreComputationEngine {
    accounting: Arc<dyn AccountingDataSource>,
    ml_client: Arc<dyn ExternalScoringClient>,
    heuristics: TraditionalHeuristics,
}

impl ScoreComputationEngine {
    pub fn new(
        accounting: Arc<dyn AccountingDataSource>,
        ml_client: Arc<dyn ExternalScoringClient>,
    ) -> Self {
        Self {
            accounting,
            ml_client,
            heuristics: TraditionalHeuristics::default(),
        }
    }

    /// Compute a score for `company_id` over `[start, end]`
    ///
    /// # Errors
    /// * `Validation` - empty company id or inverted window
    /// * data source errors - surfaced as-is, never retried
    /// * `Computation` - both hybrid branches failed
    pub async fn compute(
        &self,
        company_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        method: ScoringMethod,
    ) -> Result<CreditScore> {
        if company_id.trim().is_empty() {
            return Err(AppError::validation("Company ID cannot be empty"));
        }
        if end < start {
            return Err(AppError::validation(format!(
                "Scoring window end {} is before start {}",
                end, start
            )));
        }

        let outcome = match method {
            ScoringMethod::Traditional => self.traditional(company_id, start, end).await?,
            ScoringMethod::Ml => self.ml_with_fallback(company_id, start, end).await?,
            ScoringMethod::Hybrid => self.hybrid(company_id, start, end).await?,
        };

        info!(
            company_id = %company_id,
            requested_method = %method,
            effective_method = %outcome.method,
            score = outcome.score,
            confidence = outcome.confidence,
            "Credit score computed"
        );

        Ok(outcome.into_credit_score(company_id, Utc::now()))
    }

    async fn traditional(
        &self,
        company_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<StrategyOutcome> {
        let activity = self
            .accounting
            .period_activity(company_id, start, end)
            .await?;
        Ok(traditional_outcome(&activity, &self.heuristics))
    }

    async fn ml_raw(
        &self,
        company_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<StrategyOutcome> {
        let activity = self
            .accounting
            .period_activity(company_id, start, end)
            .await?;
        let request = MlScoringRequest::from_activity(&activity);
        let response = self.ml_client.predict(&request).await?;

        debug!(company_id = %company_id, model_version = %response.model_version, "ML branch succeeded");

        let mut explanations = response.risk_factors;
        if let Some(level) = response.risk_level {
            explanations.insert(0, format!("ML risk assessment: {}", level));
        }

        Ok(StrategyOutcome {
            method: ScoringMethod::Ml,
            score: clamp_score(response.prediction * 100.0),
            confidence: response.confidence.clamp(0.0, 1.0),
            data_quality: DataQuality::from_transaction_count(activity.transaction_count),
            components: response.component_scores,
            model_version: response.model_version,
            data_source: ML_SOURCE.to_string(),
            explanations,
            recommendations: response.recommendations,
        })
    }

    async fn ml_with_fallback(
        &self,
        company_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<StrategyOutcome> {
        match self.ml_raw(company_id, start, end).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(
                    company_id = %company_id,
                    error = %e,
                    "ML scoring failed, falling back to traditional method"
                );
                self.traditional(company_id, start, end).await
            }
        }
    }

    async fn hybrid(
        &self,
        company_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<StrategyOutcome> {
        let (traditional, ml) = join(
            self.traditional(company_id, start, end),
            self.ml_raw(company_id, start, end),
        )
        .await;

        if let Err(e) = &ml {
            warn!(company_id = %company_id, error = %e, "Hybrid ML branch failed");
        }
        if let Err(e) = &traditional {
            warn!(company_id = %company_id, error = %e, "Hybrid traditional branch failed");
        }

        merge_hybrid(traditional, ml)
    }
}

/// Merge policy of the hybrid strategy
///
/// Both ok: 40/60 weighted score, best confidence, excellent data.
/// One ok: that score with confidence x0.8 (good for traditional, fair for ML).
/// None ok: `Computation` error.
pub fn merge_hybrid(
    traditional: Result<StrategyOutcome>,
    ml: Result<StrategyOutcome>,
) -> Result<StrategyOutcome> {
    let (score, confidence, data_quality, data_source, components, explanations, recommendations) =
        match (traditional, ml) {
            (Ok(t), Ok(m)) => {
                let weighted =
                    t.score as f64 * HYBRID_TRADITIONAL_WEIGHT + m.score as f64 * HYBRID_ML_WEIGHT;
                let mut explanations = t.explanations;
                explanations.extend(m.explanations);
                let mut recommendations = t.recommendations;
                for rec in m.recommendations {
                    if !recommendations.contains(&rec) {
                        recommendations.push(rec);
                    }
                }
                (
                    clamp_score(weighted),
                    t.confidence.max(m.confidence),
                    DataQuality::Excellent,
                    format!("hybrid:{}+{}", ACCOUNTING_SOURCE, ML_SOURCE),
                    t.components.or(m.components),
                    explanations,
                    recommendations,
                )
            }
            (Ok(t), Err(_)) => (
                t.score,
                t.confidence * DEGRADED_CONFIDENCE_FACTOR,
                DataQuality::Good,
                format!("hybrid:{}", ACCOUNTING_SOURCE),
                t.components,
                t.explanations,
                t.recommendations,
            ),
            (Err(_), Ok(m)) => (
                m.score,
                m.confidence * DEGRADED_CONFIDENCE_FACTOR,
                DataQuality::Fair,
                format!("hybrid:{}", ML_SOURCE),
                m.components,
                m.explanations,
                m.recommendations,
            ),
            (Err(t), Err(m)) => {
                return Err(AppError::computation(format!(
                    "all scoring strategies failed (traditional: {}; ml: {})",
                    t, m
                )))
            }
        };

    Ok(StrategyOutcome {
        method: ScoringMethod::Hybrid,
        score,
        confidence,
        data_quality,
        components,
        model_version: HYBRID_MODEL_VERSION.to_string(),
        data_source,
        explanations,
        recommendations,
    })
}

/// Rule-based scoring over an activity summary
pub fn traditional_outcome(
    activity: &ActivitySummary,
    heuristics: &TraditionalHeuristics,
) -> StrategyOutcome {
    let components = traditional_components(activity, heuristics);
    let score = clamp_score(components.weighted_sum());

    StrategyOutcome {
        method: ScoringMethod::Traditional,
        score,
        confidence: traditional_confidence(activity.transaction_count),
        data_quality: DataQuality::from_transaction_count(activity.transaction_count),
        components: Some(components),
        model_version: TRADITIONAL_MODEL_VERSION.to_string(),
        data_source: ACCOUNTING_SOURCE.to_string(),
        explanations: explain(&components),
        recommendations: recommend(&components),
    }
}

pub fn traditional_components(
    activity: &ActivitySummary,
    h: &TraditionalHeuristics,
) -> ScoreComponents {
    let net = decimal_to_f64(activity.net_cash_flow());
    let net_flow_adjustment = if net > 0.0 {
        15.0
    } else if net < 0.0 {
        -15.0
    } else {
        0.0
    };
    let cash_flow_quality = 50.0
        + (h.inflow_regularity - 50.0) * 0.3
        + (h.outflow_control - 50.0) * 0.2
        + net_flow_adjustment;

    let active_months = activity.monthly.len().min(12) as f64;
    let business_stability = 40.0 + active_months * 2.5 + (100.0 - h.revenue_variability) * 0.3;

    let margin = activity.net_margin().clamp(-1.0, 1.0);
    let financial_health = 50.0 + margin * 50.0 - (h.debt_ratio - 0.5) * 40.0;

    let balance_penalty = if decimal_to_f64(activity.avg_balance) < 0.0 {
        20.0
    } else {
        0.0
    };
    let payment_behavior = h.payment_punctuality - balance_penalty;

    let growth_trend = 50.0 + h.growth_rate_pct * 2.0;

    ScoreComponents {
        cash_flow_quality: clamp_component(cash_flow_quality),
        business_stability: clamp_component(business_stability),
        financial_health: clamp_component(financial_health),
        payment_behavior: clamp_component(payment_behavior),
        growth_trend: clamp_component(growth_trend),
    }
}

fn explain(components: &ScoreComponents) -> Vec<String> {
    components
        .named()
        .iter()
        .filter_map(|(component, value)| {
            if *value >= 70.0 {
                Some(format!("Strong {} ({:.0}/100)", component.label(), value))
            } else if *value < 40.0 {
                Some(format!("Weak {} ({:.0}/100)", component.label(), value))
            } else {
                None
            }
        })
        .collect()
}

fn recommend(components: &ScoreComponents) -> Vec<String> {
    components
        .named()
        .iter()
        .filter(|(_, value)| *value < 50.0)
        .map(|(component, _)| {
            let advice = match component {
                ScoreComponent::CashFlowQuality => {
                    "Stabilize inflows and reduce discretionary outflows"
                }
                ScoreComponent::BusinessStability => "Build a longer, steadier activity history",
                ScoreComponent::FinancialHealth => "Reduce leverage and improve net margin",
                ScoreComponent::PaymentBehavior => {
                    "Settle obligations on schedule and keep a positive balance"
                }
                ScoreComponent::GrowthTrend => "Develop revenue growth initiatives",
            };
            advice.to_string()
        })
        .collect()
}
