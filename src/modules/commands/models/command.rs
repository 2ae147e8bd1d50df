use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Resource kinds other services may address; anything else is denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Customer,
    Company,
    CreditScore,
    FinancialData,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Customer => "customer",
            ResourceType::Company => "company",
            ResourceType::CreditScore => "credit_score",
            ResourceType::FinancialData => "financial_data",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "customer" => Ok(ResourceType::Customer),
            "company" => Ok(ResourceType::Company),
            "credit_score" => Ok(ResourceType::CreditScore),
            "financial_data" => Ok(ResourceType::FinancialData),
            other => Err(format!("Unknown resource type: {}", other)),
        }
    }
}

fn default_resource_type() -> String {
    ResourceType::Customer.as_str().to_string()
}

/// Cross-service request to change fields of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCommand {
    #[serde(alias = "customerId", alias = "companyId", alias = "customer_id")]
    pub company_id: String,
    #[serde(alias = "requestingService")]
    pub requesting_service: String,
    #[serde(default, alias = "updateFields")]
    pub update_fields: Map<String, Value>,
    #[serde(default, alias = "requestId")]
    pub request_id: Option<String>,
    #[serde(default = "default_resource_type", alias = "resourceType")]
    pub resource_type: String,
}

/// Cross-service request for one resource, answered on `response_pattern`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    #[serde(alias = "requestingService")]
    pub requesting_service: String,
    /// Resource name, optionally prefixed with `get_`
    #[serde(alias = "requestType")]
    pub request_type: String,
    #[serde(alias = "entityId")]
    pub entity_id: String,
    #[serde(alias = "responsePattern")]
    pub response_pattern: String,
    #[serde(default, alias = "requestId")]
    pub request_id: Option<String>,
}

impl ReadRequest {
    pub fn resource_type(&self) -> std::result::Result<ResourceType, String> {
        let name = self.request_type.trim();
        name.strip_prefix("get_").unwrap_or(name).parse()
    }
}

/// Structured answer to a read request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResponse {
    pub request_id: Option<String>,
    pub entity_id: String,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub status: u16,
}

/// What happened to an update command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied {
        applied_fields: Vec<String>,
        dropped_fields: Vec<String>,
    },
    Rejected {
        reason: String,
    },
    NotFound,
    Failed {
        reason: String,
    },
}
