use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::modules::scoring::models::activity::decimal_to_f64;
use crate::modules::scoring::models::{ActivitySummary, BusinessContext};

/// Engineered feature payload sent to the ML scoring service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub monthly_inflows: Vec<f64>,
    pub monthly_outflows: Vec<f64>,
    pub monthly_net_flows: Vec<f64>,
    pub monthly_transaction_counts: Vec<i64>,
    /// First differences of the monthly series
    pub inflow_diffs: Vec<f64>,
    pub outflow_diffs: Vec<f64>,
    /// Average occurrences per month, by operation type
    pub operation_frequencies: BTreeMap<String, f64>,
    pub ratios: StandardizedRatios,
    pub growth_rate: f64,
    pub inflow_volatility: f64,
    pub business: BusinessContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedRatios {
    pub net_margin: f64,
    pub outflow_to_inflow: f64,
    pub balance_to_monthly_outflow: f64,
    /// z-scores of the monthly net flows
    pub net_flow_z_scores: Vec<f64>,
}

/// Request body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlScoringRequest {
    pub company_id: String,
    pub period_start: String,
    pub period_end: String,
    pub transaction_count: i64,
    pub features: FeatureSet,
}

impl MlScoringRequest {
    pub fn from_activity(activity: &ActivitySummary) -> Self {
        Self {
            company_id: activity.company_id.clone(),
            period_start: activity.period_start.to_rfc3339(),
            period_end: activity.period_end.to_rfc3339(),
            transaction_count: activity.transaction_count,
            features: build_features(activity),
        }
    }
}

pub fn build_features(activity: &ActivitySummary) -> FeatureSet {
    let inflows: Vec<f64> = activity
        .monthly
        .iter()
        .map(|m| decimal_to_f64(m.inflows))
        .collect();
    let outflows: Vec<f64> = activity
        .monthly
        .iter()
        .map(|m| decimal_to_f64(m.outflows))
        .collect();
    let net_flows: Vec<f64> = activity
        .monthly
        .iter()
        .map(|m| decimal_to_f64(m.net_flow()))
        .collect();

    let months = activity.monthly.len().max(1) as f64;
    let operation_frequencies = activity
        .operation_counts
        .iter()
        .map(|(op, count)| (op.clone(), *count as f64 / months))
        .collect();

    let total_inflows = decimal_to_f64(activity.total_inflows);
    let total_outflows = decimal_to_f64(activity.total_outflows);
    let avg_monthly_outflow = total_outflows / months;

    FeatureSet {
        inflow_diffs: first_differences(&inflows),
        outflow_diffs: first_differences(&outflows),
        operation_frequencies,
        ratios: StandardizedRatios {
            net_margin: activity.net_margin(),
            outflow_to_inflow: ratio(total_outflows, total_inflows),
            balance_to_monthly_outflow: ratio(decimal_to_f64(activity.avg_balance), avg_monthly_outflow),
            net_flow_z_scores: standardize(&net_flows),
        },
        growth_rate: growth_rate(&inflows),
        inflow_volatility: coefficient_of_variation(&inflows),
        monthly_transaction_counts: activity.monthly.iter().map(|m| m.transaction_count).collect(),
        monthly_inflows: inflows,
        monthly_outflows: outflows,
        monthly_net_flows: net_flows,
        business: activity.business.clone(),
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() > f64::EPSILON {
        numerator / denominator
    } else {
        0.0
    }
}

pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn standardize(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let sd = std_dev(values);
    values
        .iter()
        .map(|v| if sd > 0.0 { (v - m) / sd } else { 0.0 })
        .collect()
}

/// Relative change between the first and the last month
pub fn growth_rate(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() > 1 => ratio(last - first, first.abs()),
        _ => 0.0,
    }
}

pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    ratio(std_dev(values), mean(values).abs())
}
