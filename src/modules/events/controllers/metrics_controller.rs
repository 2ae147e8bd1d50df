// Publish telemetry endpoint
//
// GET /api/events/metrics - Returns the current publish counters

use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::modules::events::services::PublishMetrics;

#[tracing::instrument(skip(metrics))]
pub async fn publish_metrics(metrics: web::Data<Arc<PublishMetrics>>) -> HttpResponse {
    HttpResponse::Ok().json(metrics.snapshot())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/events/metrics", web::get().to(publish_metrics));
}
