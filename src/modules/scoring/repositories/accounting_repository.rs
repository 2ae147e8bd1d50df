use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::core::{AppError, Result};
use crate::modules::scoring::models::{ActivitySummary, BusinessContext, MonthlyAggregate};

/// Read-only port onto the accounting service's ledger
#[async_trait]
pub trait AccountingDataSource: Send + Sync {
    /// Aggregated activity in the inclusive window `[start, end]`
    async fn period_activity(
        &self,
        company_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ActivitySummary>;
}

/// Aggregates the accounting projection tables in MySQL
#[derive(Clone)]
pub struct MySqlAccountingRepository {
    pool: MySqlPool,
}

impl MySqlAccountingRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct MonthlyRow {
    month: NaiveDate,
    inflows: Decimal,
    outflows: Decimal,
    transaction_count: i64,
}

#[derive(FromRow)]
struct OperationRow {
    operation_type: String,
    occurrences: i64,
}

#[derive(FromRow)]
struct CompanyRow {
    sector: Option<String>,
    years_in_operation: Option<f64>,
    employee_count: Option<i64>,
}

#[async_trait]
impl AccountingDataSource for MySqlAccountingRepository {
    async fn period_activity(
        &self,
        company_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ActivitySummary> {
        if end < start {
            return Err(AppError::validation("Activity window ends before it starts"));
        }

        let monthly_rows = sqlx::query_as::<_, MonthlyRow>(
            r#"
            SELECT
                CAST(DATE_FORMAT(booked_at, '%Y-%m-01') AS DATE) AS month,
                COALESCE(SUM(CASE WHEN direction = 'in' THEN amount ELSE 0 END), 0) AS inflows,
                COALESCE(SUM(CASE WHEN direction = 'out' THEN amount ELSE 0 END), 0) AS outflows,
                COUNT(*) AS transaction_count
            FROM accounting_transactions
            WHERE company_id = ? AND booked_at BETWEEN ? AND ?
            GROUP BY month
            ORDER BY month
            "#,
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to aggregate accounting data: {}", e)))?;

        let avg_balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT AVG(balance_after)
            FROM accounting_transactions
            WHERE company_id = ? AND booked_at BETWEEN ? AND ?
            "#,
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let operations = sqlx::query_as::<_, OperationRow>(
            r#"
            SELECT operation_type, COUNT(*) AS occurrences
            FROM accounting_transactions
            WHERE company_id = ? AND booked_at BETWEEN ? AND ?
            GROUP BY operation_type
            "#,
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let company = sqlx::query_as::<_, CompanyRow>(
            "SELECT sector, years_in_operation, employee_count FROM companies WHERE id = ?",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        let monthly: Vec<MonthlyAggregate> = monthly_rows
            .into_iter()
            .map(|row| MonthlyAggregate {
                month: row.month,
                inflows: row.inflows,
                outflows: row.outflows,
                transaction_count: row.transaction_count,
            })
            .collect();

        let mut summary = ActivitySummary::empty(company_id, start, end);
        summary.total_inflows = monthly.iter().map(|m| m.inflows).sum();
        summary.total_outflows = monthly.iter().map(|m| m.outflows).sum();
        summary.transaction_count = monthly.iter().map(|m| m.transaction_count).sum();
        summary.avg_balance = avg_balance.unwrap_or_default().round_dp(2);
        summary.monthly = monthly;
        summary.operation_counts = operations
            .into_iter()
            .map(|op| (op.operation_type, op.occurrences))
            .collect::<BTreeMap<_, _>>();
        summary.business = company
            .map(|c| BusinessContext {
                sector: c.sector,
                years_in_operation: c.years_in_operation,
                employee_count: c.employee_count,
            })
            .unwrap_or_default();

        Ok(summary)
    }
}

/// Fixed activity per company, for the memory backend and tests
///
/// Companies without a registered summary get an empty window; companies
/// marked unavailable fail as if the ledger were unreachable.
#[derive(Default)]
pub struct StaticAccountingDataSource {
    summaries: RwLock<HashMap<String, ActivitySummary>>,
    unavailable: RwLock<Vec<String>>,
}

impl StaticAccountingDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, summary: ActivitySummary) {
        self.summaries
            .write()
            .await
            .insert(summary.company_id.clone(), summary);
    }

    pub async fn mark_unavailable(&self, company_id: &str) {
        self.unavailable.write().await.push(company_id.to_string());
    }
}

#[async_trait]
impl AccountingDataSource for StaticAccountingDataSource {
    async fn period_activity(
        &self,
        company_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ActivitySummary> {
        if self.unavailable.read().await.iter().any(|c| c == company_id) {
            return Err(AppError::Internal(format!(
                "Accounting data unavailable for company '{}'",
                company_id
            )));
        }

        let summary = match self.summaries.read().await.get(company_id) {
            Some(summary) => {
                let mut summary = summary.clone();
                summary.period_start = start;
                summary.period_end = end;
                summary
            }
            None => ActivitySummary::empty(company_id, start, end),
        };
        Ok(summary)
    }
}
