use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::core::Result;

/// Lists companies that opted into continuous monitoring
#[async_trait]
pub trait MonitoredCompanies: Send + Sync {
    async fn list_monitored(&self) -> Result<Vec<String>>;
}

#[derive(Clone)]
pub struct MySqlCompanyRepository {
    pool: MySqlPool,
}

impl MySqlCompanyRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MonitoredCompanies for MySqlCompanyRepository {
    async fn list_monitored(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT company_id
            FROM credit_monitoring_settings
            WHERE enabled = TRUE
            ORDER BY company_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

/// Fixed company list for the memory backend and tests
#[derive(Default)]
pub struct StaticCompanyDirectory {
    companies: Vec<String>,
}

impl StaticCompanyDirectory {
    pub fn new(companies: Vec<String>) -> Self {
        Self {
            companies,
        }
    }
}

#[async_trait]
impl MonitoredCompanies for StaticCompanyDirectory {
    async fn list_monitored(&self) -> Result<Vec<String>> {
        Ok(self.companies.clone())
    }
}
