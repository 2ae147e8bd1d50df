use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::modules::commands::models::{Action, ResourceType};

type Grant = (&'static str, ResourceType, &'static [Action]);

/// Service x resource -> permitted actions
const PERMISSIONS: &[Grant] = &[
    (
        "customer-service",
        ResourceType::Customer,
        &[Action::Read, Action::Update, Action::Delete],
    ),
    ("customer-service", ResourceType::Company, &[Action::Read, Action::Update]),
    ("customer-service", ResourceType::CreditScore, &[Action::Read]),
    ("accounting-service", ResourceType::Customer, &[Action::Read]),
    ("accounting-service", ResourceType::Company, &[Action::Read]),
    (
        "accounting-service",
        ResourceType::FinancialData,
        &[Action::Read, Action::Update],
    ),
    ("credit-score-service", ResourceType::Customer, &[Action::Read, Action::Update]),
    ("credit-score-service", ResourceType::Company, &[Action::Read]),
    ("credit-score-service", ResourceType::FinancialData, &[Action::Read]),
    (
        "credit-score-service",
        ResourceType::CreditScore,
        &[Action::Read, Action::Update],
    ),
    ("financing-service", ResourceType::Customer, &[Action::Read]),
    ("financing-service", ResourceType::Company, &[Action::Read]),
    ("financing-service", ResourceType::CreditScore, &[Action::Read]),
];

/// Fields each service may write through update commands
const FIELD_ALLOW_LIST: &[(&str, &[&str])] = &[
    (
        "customer-service",
        &["name", "email", "phone", "address", "industry", "company_size", "status"],
    ),
    (
        "credit-score-service",
        &["credit_score", "risk_level", "score_class", "last_scored_at"],
    ),
    (
        "accounting-service",
        &["annual_revenue", "financial_summary", "last_sync_at"],
    ),
    ("financing-service", &["financing_status", "credit_limit"]),
];

/// Static gate for inbound cross-service commands
#[derive(Debug, Clone, Copy, Default)]
pub struct InboundCommandAuthorizer;

impl InboundCommandAuthorizer {
    pub fn new() -> Self {
        Self
    }

    /// Unknown services and unlisted resources are denied
    pub fn authorize(&self, service: &str, action: Action, resource: ResourceType) -> bool {
        PERMISSIONS
            .iter()
            .find(|(s, r, _)| *s == service && *r == resource)
            .map(|(_, _, actions)| actions.contains(&action))
            .unwrap_or(false)
    }

    pub fn allowed_fields(&self, service: &str) -> BTreeSet<&'static str> {
        FIELD_ALLOW_LIST
            .iter()
            .find(|(s, _)| *s == service)
            .map(|(_, fields)| fields.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Keep only the allow-listed entries of `raw`
    pub fn sanitize(&self, raw: &Map<String, Value>, allowed: &BTreeSet<&str>) -> Map<String, Value> {
        raw.iter()
            .filter(|(key, _)| allowed.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
