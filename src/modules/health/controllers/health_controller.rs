use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

/// Shared data for the probes; `pool` is absent on the in-memory backend
#[derive(Clone)]
pub struct HealthState {
    pub service_name: String,
    pub pool: Option<MySqlPool>,
}

/// Health check response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: String,
    pub application: String,
}

/// GET /health - Liveness and storage probe
///
/// Reports `degraded` with 503 when the configured database does not answer.
pub async fn health_check(state: web::Data<HealthState>) -> impl Responder {
    let database = match &state.pool {
        Some(pool) => match sqlx::query("SELECT 1").fetch_one(pool).await {
            Ok(_) => "healthy",
            Err(e) => {
                tracing::error!(error = %e, "Database health check failed");
                "unhealthy"
            }
        },
        None => "in_memory",
    };

    let healthy = database != "unhealthy";
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        service: state.service_name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks: HealthChecks {
            database: database.to_string(),
            application: "healthy".to_string(),
        },
    };

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
