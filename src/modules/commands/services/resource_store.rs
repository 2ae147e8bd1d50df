use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::core::Result;
use crate::modules::commands::models::ResourceType;

/// Local projection of resources owned by other services
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn fetch(&self, resource: ResourceType, id: &str) -> Result<Option<Value>>;

    /// Merge `fields` into the stored resource; `false` when it does not exist
    async fn apply(
        &self,
        resource: ResourceType,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<bool>;
}

#[derive(Default)]
pub struct InMemoryResourceStore {
    records: RwLock<HashMap<(ResourceType, String), Map<String, Value>>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, resource: ResourceType, id: &str, fields: Map<String, Value>) {
        self.records
            .write()
            .await
            .insert((resource, id.to_string()), fields);
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn fetch(&self, resource: ResourceType, id: &str) -> Result<Option<Value>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(resource, id.to_string()))
            .map(|fields| Value::Object(fields.clone())))
    }

    async fn apply(
        &self,
        resource: ResourceType,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&(resource, id.to_string())) {
            Some(existing) => {
                for (key, value) in fields {
                    existing.insert(key.clone(), value.clone());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
