use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, MySqlPool};
use tokio::sync::RwLock;

use crate::core::{AppError, Result};
use crate::modules::monitoring::models::{
    Alert, MonitoringInterval, MonitoringSnapshot, PeriodChange, PeriodCumulative,
};
use crate::modules::scoring::models::ScoreComponents;

/// Persistence port for monitoring snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Insert, or replace the snapshot with the same (company, interval, period_start)
    async fn upsert(&self, snapshot: &MonitoringSnapshot) -> Result<MonitoringSnapshot>;

    async fn find_by_period(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
        period_start: DateTime<Utc>,
    ) -> Result<Option<MonitoringSnapshot>>;

    async fn find_latest(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
    ) -> Result<Option<MonitoringSnapshot>>;

    /// Snapshots whose period starts in `[from, to]`, oldest first
    async fn find_range(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MonitoringSnapshot>>;

    /// Snapshots of every interval recorded at or after `since`
    async fn recorded_since(
        &self,
        company_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MonitoringSnapshot>>;
}

/// MySQL-backed snapshot repository
#[derive(Clone)]
pub struct MySqlSnapshotRepository {
    pool: MySqlPool,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, company_id, interval_type, period_start, period_end, score, health_status,
           period_cumulative, score_components, period_change, alerts, credit_score_id,
           created_at
    FROM monitoring_snapshots
"#;

impl MySqlSnapshotRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for MySqlSnapshotRepository {
    async fn upsert(&self, snapshot: &MonitoringSnapshot) -> Result<MonitoringSnapshot> {
        sqlx::query(
            r#"
            INSERT INTO monitoring_snapshots (
                id, company_id, interval_type, period_start, period_end, score,
                health_status, period_cumulative, score_components, period_change,
                alerts, credit_score_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                score = VALUES(score),
                health_status = VALUES(health_status),
                period_cumulative = VALUES(period_cumulative),
                score_components = VALUES(score_components),
                period_change = VALUES(period_change),
                alerts = VALUES(alerts),
                credit_score_id = VALUES(credit_score_id),
                created_at = VALUES(created_at)
            "#,
        )
        .bind(&snapshot.id)
        .bind(&snapshot.company_id)
        .bind(snapshot.interval.as_str())
        .bind(snapshot.period_start)
        .bind(snapshot.period_end)
        .bind(snapshot.score)
        .bind(snapshot.health_status.as_str())
        .bind(Json(&snapshot.period_cumulative))
        .bind(snapshot.score_components.map(Json))
        .bind(snapshot.period_change.map(Json))
        .bind(Json(&snapshot.alerts))
        .bind(&snapshot.credit_score_id)
        .bind(snapshot.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to save monitoring snapshot: {}", e)))?;

        // The row id is kept from the first insert on conflict
        self.find_by_period(&snapshot.company_id, snapshot.interval, snapshot.period_start)
            .await?
            .ok_or_else(|| AppError::Internal("Snapshot was saved but not found".to_string()))
    }

    async fn find_by_period(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
        period_start: DateTime<Utc>,
    ) -> Result<Option<MonitoringSnapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            "{} WHERE company_id = ? AND interval_type = ? AND period_start = ?",
            SELECT_COLUMNS
        ))
        .bind(company_id)
        .bind(interval.as_str())
        .bind(period_start)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SnapshotRow::into_snapshot).transpose()
    }

    async fn find_latest(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
    ) -> Result<Option<MonitoringSnapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            "{} WHERE company_id = ? AND interval_type = ? ORDER BY period_start DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(company_id)
        .bind(interval.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SnapshotRow::into_snapshot).transpose()
    }

    async fn find_range(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MonitoringSnapshot>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
            r#"{} WHERE company_id = ? AND interval_type = ?
                AND period_start BETWEEN ? AND ?
              ORDER BY period_start ASC"#,
            SELECT_COLUMNS
        ))
        .bind(company_id)
        .bind(interval.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SnapshotRow::into_snapshot).collect()
    }

    async fn recorded_since(
        &self,
        company_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MonitoringSnapshot>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
            "{} WHERE company_id = ? AND created_at >= ? ORDER BY period_start ASC",
            SELECT_COLUMNS
        ))
        .bind(company_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SnapshotRow::into_snapshot).collect()
    }
}

#[derive(FromRow)]
struct SnapshotRow {
    id: String,
    company_id: String,
    interval_type: String,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    score: i32,
    health_status: String,
    period_cumulative: Json<PeriodCumulative>,
    score_components: Option<Json<ScoreComponents>>,
    period_change: Option<Json<PeriodChange>>,
    alerts: Json<Vec<Alert>>,
    credit_score_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl SnapshotRow {
    fn into_snapshot(self) -> Result<MonitoringSnapshot> {
        Ok(MonitoringSnapshot {
            id: self.id,
            company_id: self.company_id,
            interval: self.interval_type.parse().map_err(AppError::Internal)?,
            period_start: self.period_start,
            period_end: self.period_end,
            score: self.score,
            health_status: self.health_status.parse().map_err(AppError::Internal)?,
            period_cumulative: self.period_cumulative.0,
            score_components: self.score_components.map(|c| c.0),
            period_change: self.period_change.map(|c| c.0),
            alerts: self.alerts.0,
            credit_score_id: self.credit_score_id,
            created_at: self.created_at,
        })
    }
}

/// In-process snapshot store for the memory backend and tests
#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<Vec<MonitoringSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn upsert(&self, snapshot: &MonitoringSnapshot) -> Result<MonitoringSnapshot> {
        let mut snapshots = self.snapshots.write().await;
        let existing = snapshots.iter_mut().find(|s| {
            s.company_id == snapshot.company_id
                && s.interval == snapshot.interval
                && s.period_start == snapshot.period_start
        });

        let stored = match existing {
            Some(current) => {
                let id = current.id.clone();
                *current = MonitoringSnapshot {
                    id,
                    ..snapshot.clone()
                };
                current.clone()
            }
            None => {
                snapshots.push(snapshot.clone());
                snapshot.clone()
            }
        };
        Ok(stored)
    }

    async fn find_by_period(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
        period_start: DateTime<Utc>,
    ) -> Result<Option<MonitoringSnapshot>> {
        Ok(self
            .snapshots
            .read()
            .await
            .iter()
            .find(|s| {
                s.company_id == company_id
                    && s.interval == interval
                    && s.period_start == period_start
            })
            .cloned())
    }

    async fn find_latest(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
    ) -> Result<Option<MonitoringSnapshot>> {
        Ok(self
            .snapshots
            .read()
            .await
            .iter()
            .filter(|s| s.company_id == company_id && s.interval == interval)
            .max_by_key(|s| s.period_start)
            .cloned())
    }

    async fn find_range(
        &self,
        company_id: &str,
        interval: MonitoringInterval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MonitoringSnapshot>> {
        let mut matching: Vec<MonitoringSnapshot> = self
            .snapshots
            .read()
            .await
            .iter()
            .filter(|s| {
                s.company_id == company_id
                    && s.interval == interval
                    && s.period_start >= from
                    && s.period_start <= to
            })
            .cloned()
            .collect();
        matching.sort_by_key(|s| s.period_start);
        Ok(matching)
    }

    async fn recorded_since(
        &self,
        company_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MonitoringSnapshot>> {
        let mut matching: Vec<MonitoringSnapshot> = self
            .snapshots
            .read()
            .await
            .iter()
            .filter(|s| s.company_id == company_id && s.created_at >= since)
            .cloned()
            .collect();
        matching.sort_by_key(|s| s.period_start);
        Ok(matching)
    }
}
