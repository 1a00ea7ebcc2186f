use actix_web::{web, HttpResponse};

use crate::health::aggregate_health;
use crate::metrics::REGISTRY;
use crate::state::AppState;

/// GET /health - Liveness of the gateway itself
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "api-gateway",
        "time": chrono::Utc::now(),
    }))
}

/// GET /services/health - Fresh probe of every backend; always 200
pub async fn services_health(state: web::Data<AppState>) -> HttpResponse {
    let report = aggregate_health(
        &state.http_client,
        state.config.routes.backends(),
        state.config.probe_timeout,
    )
    .await;
    HttpResponse::Ok().json(report)
}

/// GET /metrics - Prometheus metrics endpoint
pub async fn metrics() -> HttpResponse {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return HttpResponse::InternalServerError().body("Failed to encode metrics");
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/services/health", web::get().to(services_health))
        .route("/metrics", web::get().to(metrics));
}
