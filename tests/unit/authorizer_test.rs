// Permission matrix and field allow-list of inbound commands

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use scorewatch::modules::commands::models::{Action, ResourceType};
use scorewatch::modules::commands::services::InboundCommandAuthorizer;

const SERVICES: [&str; 4] = [
    "customer-service",
    "accounting-service",
    "credit-score-service",
    "financing-service",
];

#[test]
fn test_read_only_customer_access_rejects_update() {
    let authorizer = InboundCommandAuthorizer::new();

    assert!(authorizer.authorize("financing-service", Action::Read, ResourceType::Customer));
    assert!(!authorizer.authorize("financing-service", Action::Update, ResourceType::Customer));
    assert!(!authorizer.authorize("financing-service", Action::Delete, ResourceType::Customer));
}

#[test]
fn test_only_owner_may_delete_customers() {
    let authorizer = InboundCommandAuthorizer::new();

    let deleters: Vec<&str> = SERVICES
        .iter()
        .copied()
        .filter(|s| authorizer.authorize(s, Action::Delete, ResourceType::Customer))
        .collect();

    assert_eq!(deleters, vec!["customer-service"]);
}

#[test]
fn test_sanitize_drops_fields_outside_allow_list() {
    let authorizer = InboundCommandAuthorizer::new();
    let raw = json!({
        "name": "Acme Ltd",
        "email": "finance@acme.test",
        "credit_score": 99,
        "is_admin": true
    });

    let allowed = authorizer.allowed_fields("customer-service");
    let clean = authorizer.sanitize(raw.as_object().unwrap(), &allowed);

    assert_eq!(clean.len(), 2);
    assert_eq!(clean["name"], "Acme Ltd");
    assert!(!clean.contains_key("credit_score"));
    assert!(!clean.contains_key("is_admin"));
}

#[test]
fn test_unknown_service_gets_nothing() {
    let authorizer = InboundCommandAuthorizer::new();
    let raw = json!({"name": "x"});

    let allowed = authorizer.allowed_fields("unknown-service");
    assert!(authorizer.sanitize(raw.as_object().unwrap(), &allowed).is_empty());
}

fn raw_fields() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(
        prop::sample::select(vec![
            "name", "email", "phone", "status", "credit_score", "risk_level",
            "annual_revenue", "credit_limit", "password", "role",
        ]),
        any::<i64>(),
        0..10,
    )
    .prop_map(|fields| {
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect()
    })
}

proptest! {
    /// Property: sanitized output is the intersection of raw and allowed keys
    #[test]
    fn test_sanitize_is_intersection(
        service in prop::sample::select(SERVICES.to_vec()),
        raw in raw_fields(),
    ) {
        let authorizer = InboundCommandAuthorizer::new();
        let allowed = authorizer.allowed_fields(service);
        let clean = authorizer.sanitize(&raw, &allowed);

        for (key, value) in &clean {
            prop_assert!(allowed.contains(key.as_str()));
            prop_assert_eq!(raw.get(key), Some(value));
        }
        for key in raw.keys() {
            prop_assert_eq!(clean.contains_key(key), allowed.contains(key.as_str()));
        }
    }
}
