//! Canonical topic names and the legacy alias table.

pub const CREDIT_SCORE_CALCULATED: &str = "credit-score.calculated";
pub const CREDIT_SCORE_UPDATED: &str = "credit-score.updated";
pub const CREDIT_SCORE_EXPIRED: &str = "credit-score.expired";
pub const CREDIT_SCORE_MONITORING_ALERT: &str = "credit-score.monitoring.alert";
pub const CREDIT_SCORE_REQUEST: &str = "credit-score.request";
pub const CREDIT_SCORE_RESPONSE: &str = "credit-score.response";

pub const CUSTOMER_CREATED: &str = "customer.lifecycle.created";
pub const CUSTOMER_UPDATED: &str = "customer.lifecycle.updated";
pub const CUSTOMER_UPDATE_REQUEST: &str = "customer.command.update";
pub const CUSTOMER_DATA_REQUEST: &str = "customer.command.read";
pub const COMPANY_PROFILE_UPDATED: &str = "company.profile.updated";

/// Legacy name to canonical name, matched case-insensitively
const TOPIC_ALIASES: &[(&str, &str)] = &[
    ("credit_score_calculated", CREDIT_SCORE_CALCULATED),
    ("credit.score.calculated", CREDIT_SCORE_CALCULATED),
    ("creditscore.calculated", CREDIT_SCORE_CALCULATED),
    ("credit_score_updated", CREDIT_SCORE_UPDATED),
    ("credit.score.updated", CREDIT_SCORE_UPDATED),
    ("creditscore.updated", CREDIT_SCORE_UPDATED),
    ("credit_score_expired", CREDIT_SCORE_EXPIRED),
    ("credit.score.expired", CREDIT_SCORE_EXPIRED),
    ("credit_score_alert", CREDIT_SCORE_MONITORING_ALERT),
    ("credit.score.alert", CREDIT_SCORE_MONITORING_ALERT),
    ("credit.monitoring.alert", CREDIT_SCORE_MONITORING_ALERT),
    ("credit_score_request", CREDIT_SCORE_REQUEST),
    ("credit.score.request", CREDIT_SCORE_REQUEST),
    ("credit_score_response", CREDIT_SCORE_RESPONSE),
    ("credit.score.response", CREDIT_SCORE_RESPONSE),
    ("customer.created", CUSTOMER_CREATED),
    ("customer_created", CUSTOMER_CREATED),
    ("customer.updated", CUSTOMER_UPDATED),
    ("customer_updated", CUSTOMER_UPDATED),
    ("customer.update.request", CUSTOMER_UPDATE_REQUEST),
    ("customer_update_request", CUSTOMER_UPDATE_REQUEST),
    ("customer.data.request", CUSTOMER_DATA_REQUEST),
    ("customer_data_request", CUSTOMER_DATA_REQUEST),
    ("company.updated", COMPANY_PROFILE_UPDATED),
    ("company_profile_updated", COMPANY_PROFILE_UPDATED),
];

/// Resolve a topic name or legacy alias to its canonical name
///
/// Canonical names resolve to themselves; unknown names pass through unchanged.
pub fn resolve_topic(name: &str) -> String {
    let normalized = name.trim().to_lowercase();
    TOPIC_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| name.to_string())
}
