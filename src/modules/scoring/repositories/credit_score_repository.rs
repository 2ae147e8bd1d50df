use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, MySqlPool};
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::core::{AppError, Result};
use crate::modules::scoring::models::{CreditScore, ScoreChange, ScoreComponents};

/// Persistence port for credit scores
///
/// Scores are append-only; a new calculation supersedes the previous one
/// for the same company.
#[async_trait]
pub trait CreditScoreStore: Send + Sync {
    async fn save(&self, score: &CreditScore) -> Result<CreditScore>;

    async fn find_by_id(&self, id: &str) -> Result<Option<CreditScore>>;

    /// Most recently calculated score for the company
    async fn find_latest(&self, company_id: &str) -> Result<Option<CreditScore>>;

    /// Newest first
    async fn find_by_company(&self, company_id: &str, limit: u32) -> Result<Vec<CreditScore>>;

    async fn mark_distributed(&self, id: &str) -> Result<()>;

    /// Current (non-superseded) scores whose validity ended and whose
    /// expiry has not been announced yet
    async fn find_unannounced_expired(&self, now: DateTime<Utc>) -> Result<Vec<CreditScore>>;

    async fn mark_expiry_announced(&self, id: &str) -> Result<()>;
}

/// MySQL-backed credit score repository
#[derive(Clone)]
pub struct MySqlCreditScoreRepository {
    pool: MySqlPool,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, company_id, score, risk_level, score_class, calculated_at, valid_until,
           model_version, data_source, confidence_score, data_quality, method,
           components, explanations, recommendations, score_change, distributed
    FROM credit_scores
"#;

impl MySqlCreditScoreRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditScoreStore for MySqlCreditScoreRepository {
    async fn save(&self, score: &CreditScore) -> Result<CreditScore> {
        sqlx::query(
            r#"
            INSERT INTO credit_scores (
                id, company_id, score, risk_level, score_class, calculated_at, valid_until,
                model_version, data_source, confidence_score, data_quality, method,
                components, explanations, recommendations, score_change, distributed
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&score.id)
        .bind(&score.company_id)
        .bind(score.score)
        .bind(score.risk_level.as_str())
        .bind(score.score_class.as_str())
        .bind(score.calculated_at)
        .bind(score.valid_until)
        .bind(&score.model_version)
        .bind(&score.data_source)
        .bind(score.confidence_score)
        .bind(score.data_quality.as_str())
        .bind(score.method.to_string())
        .bind(score.components.map(Json))
        .bind(Json(&score.explanations))
        .bind(Json(&score.recommendations))
        .bind(score.score_change.map(Json))
        .bind(score.distributed)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to save credit score: {}", e)))?;

        Ok(score.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<CreditScore>> {
        let row = sqlx::query_as::<_, CreditScoreRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(CreditScoreRow::into_credit_score).transpose()
    }

    async fn find_latest(&self, company_id: &str) -> Result<Option<CreditScore>> {
        let row = sqlx::query_as::<_, CreditScoreRow>(&format!(
            "{} WHERE company_id = ? ORDER BY calculated_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CreditScoreRow::into_credit_score).transpose()
    }

    async fn find_by_company(&self, company_id: &str, limit: u32) -> Result<Vec<CreditScore>> {
        let rows = sqlx::query_as::<_, CreditScoreRow>(&format!(
            "{} WHERE company_id = ? ORDER BY calculated_at DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(company_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(CreditScoreRow::into_credit_score)
            .collect()
    }

    async fn mark_distributed(&self, id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE credit_scores SET distributed = TRUE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Credit score '{}' not found", id)));
        }
        Ok(())
    }

    async fn find_unannounced_expired(&self, now: DateTime<Utc>) -> Result<Vec<CreditScore>> {
        let rows = sqlx::query_as::<_, CreditScoreRow>(&format!(
            r#"{} WHERE valid_until <= ?
                AND expiry_announced = FALSE
                AND calculated_at = (
                    SELECT MAX(c2.calculated_at) FROM credit_scores c2
                    WHERE c2.company_id = credit_scores.company_id
                )
              ORDER BY valid_until"#,
            SELECT_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(CreditScoreRow::into_credit_score)
            .collect()
    }

    async fn mark_expiry_announced(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE credit_scores SET expiry_announced = TRUE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct CreditScoreRow {
    id: String,
    company_id: String,
    score: i32,
    risk_level: String,
    score_class: String,
    calculated_at: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    model_version: String,
    data_source: String,
    confidence_score: f64,
    data_quality: String,
    method: String,
    components: Option<Json<ScoreComponents>>,
    explanations: Json<Vec<String>>,
    recommendations: Json<Vec<String>>,
    score_change: Option<Json<ScoreChange>>,
    distributed: bool,
}

impl CreditScoreRow {
    fn into_credit_score(self) -> Result<CreditScore> {
        Ok(CreditScore {
            id: self.id,
            company_id: self.company_id,
            score: self.score,
            risk_level: self.risk_level.parse().map_err(AppError::Internal)?,
            score_class: self.score_class.parse().map_err(AppError::Internal)?,
            calculated_at: self.calculated_at,
            valid_until: self.valid_until,
            model_version: self.model_version,
            data_source: self.data_source,
            confidence_score: self.confidence_score,
            data_quality: self.data_quality.parse().map_err(AppError::Internal)?,
            method: self.method.parse().map_err(AppError::Internal)?,
            components: self.components.map(|c| c.0),
            explanations: self.explanations.0,
            recommendations: self.recommendations.0,
            score_change: self.score_change.map(|c| c.0),
            distributed: self.distributed,
        })
    }
}

/// In-process credit score store for the memory backend and tests
#[derive(Default)]
pub struct InMemoryCreditScoreStore {
    scores: RwLock<Vec<CreditScore>>,
    expiry_announced: RwLock<HashSet<String>>,
}

impl InMemoryCreditScoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CreditScoreStore for InMemoryCreditScoreStore {
    async fn save(&self, score: &CreditScore) -> Result<CreditScore> {
        let mut scores = self.scores.write().await;
        if scores.iter().any(|s| s.id == score.id) {
            return Err(AppError::validation(format!(
                "Credit score '{}' already exists",
                score.id
            )));
        }
        scores.push(score.clone());
        Ok(score.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<CreditScore>> {
        Ok(self.scores.read().await.iter().find(|s| s.id == id).cloned())
    }

    async fn find_latest(&self, company_id: &str) -> Result<Option<CreditScore>> {
        Ok(self
            .scores
            .read()
            .await
            .iter()
            .filter(|s| s.company_id == company_id)
            .max_by_key(|s| s.calculated_at)
            .cloned())
    }

    async fn find_by_company(&self, company_id: &str, limit: u32) -> Result<Vec<CreditScore>> {
        let mut matching: Vec<CreditScore> = self
            .scores
            .read()
            .await
            .iter()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.calculated_at.cmp(&a.calculated_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn mark_distributed(&self, id: &str) -> Result<()> {
        let mut scores = self.scores.write().await;
        let score = scores
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::not_found(format!("Credit score '{}' not found", id)))?;
        score.distributed = true;
        Ok(())
    }

    async fn find_unannounced_expired(&self, now: DateTime<Utc>) -> Result<Vec<CreditScore>> {
        let scores = self.scores.read().await;
        let announced = self.expiry_announced.read().await;

        let mut latest: Vec<&CreditScore> = Vec::new();
        for score in scores.iter() {
            match latest.iter_mut().find(|s| s.company_id == score.company_id) {
                Some(current) if current.calculated_at < score.calculated_at => *current = score,
                Some(_) => {}
                None => latest.push(score),
            }
        }

        let mut expired: Vec<CreditScore> = latest
            .into_iter()
            .filter(|s| s.is_expired(now) && !announced.contains(&s.id))
            .cloned()
            .collect();
        expired.sort_by_key(|s| s.valid_until);
        Ok(expired)
    }

    async fn mark_expiry_announced(&self, id: &str) -> Result<()> {
        self.expiry_announced.write().await.insert(id.to_string());
        Ok(())
    }
}
