use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::core::error::AppError;
use crate::modules::monitoring::models::MonitoringInterval;
use crate::modules::monitoring::services::MonitoringLedger;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_interval")]
    pub interval: MonitoringInterval,
    #[serde(default = "default_history_days")]
    pub days: i64,
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    #[serde(default = "default_alert_days")]
    pub days: i64,
}

fn default_interval() -> MonitoringInterval {
    MonitoringInterval::Daily
}

fn default_history_days() -> i64 {
    30
}

fn default_alert_days() -> i64 {
    7
}

/// GET /api/monitoring/{company_id}/dashboard
pub async fn dashboard(
    ledger: web::Data<Arc<MonitoringLedger>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let dashboard = ledger.dashboard(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}

/// GET /api/monitoring/{company_id}/history?interval=weekly&days=90
pub async fn history(
    ledger: web::Data<Arc<MonitoringLedger>>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let snapshots = ledger
        .history(&path.into_inner(), query.interval, query.days)
        .await?;
    Ok(HttpResponse::Ok().json(snapshots))
}

/// GET /api/monitoring/{company_id}/alerts?days=7
pub async fn alerts(
    ledger: web::Data<Arc<MonitoringLedger>>,
    path: web::Path<String>,
    query: web::Query<AlertsQuery>,
) -> Result<HttpResponse, AppError> {
    let alerts = ledger.active_alerts(&path.into_inner(), query.days).await?;
    Ok(HttpResponse::Ok().json(alerts))
}

/// GET /api/monitoring/{company_id}/trends
pub async fn trends(
    ledger: web::Data<Arc<MonitoringLedger>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let comparison = ledger.trend_comparison(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comparison))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/monitoring/{company_id}")
            .route("/dashboard", web::get().to(dashboard))
            .route("/history", web::get().to(history))
            .route("/alerts", web::get().to(alerts))
            .route("/trends", web::get().to(trends)),
    );
}
