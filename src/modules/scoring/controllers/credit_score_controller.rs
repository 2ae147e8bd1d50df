use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::core::error::AppError;
use crate::modules::scoring::models::ScoringMethod;
use crate::modules::scoring::services::CreditScoreService;

/// Window used when the caller does not bound the calculation
pub const DEFAULT_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Deserialize)]
pub struct CalculateScoreRequest {
    pub company_id: String,
    #[serde(default)]
    pub method: ScoringMethod,
    #[serde(default)]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub period_end: Option<DateTime<Utc>>,
}

impl CalculateScoreRequest {
    fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let end = self.period_end.unwrap_or(now);
        let start = match self.period_start {
            Some(start) => start,
            None => end
                .checked_sub_signed(Duration::days(DEFAULT_WINDOW_DAYS))
                .ok_or_else(|| AppError::validation("period_end is out of range"))?,
        };
        Ok((start, end))
    }
}

/// Calculate and store a score; distribution runs after the response
/// POST /api/credit-scores/calculate
pub async fn calculate_score(
    service: web::Data<Arc<CreditScoreService>>,
    request: web::Json<CalculateScoreRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    let (start, end) = request.window(Utc::now())?;

    let outcome = service
        .calculate_deferred(&request.company_id, start, end, request.method)
        .await?;

    Ok(HttpResponse::Created().json(outcome.score))
}

/// GET /api/credit-scores/{company_id}/latest
pub async fn latest_score(
    service: web::Data<Arc<CreditScoreService>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let company_id = path.into_inner();
    let score = service
        .latest(&company_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Credit score for company {}", company_id)))?;

    Ok(HttpResponse::Ok().json(score))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/credit-scores")
            .route("/calculate", web::post().to(calculate_score))
            .route("/{company_id}/latest", web::get().to(latest_score)),
    );
}
