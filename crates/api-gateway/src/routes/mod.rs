pub mod gateway;
pub mod health;

use actix_web::web;

/// Mount every gateway route. The fixed endpoints are registered before the
/// proxy fallback, so they win over any configured prefix.
pub fn configure(cfg: &mut web::ServiceConfig) {
    health::configure(cfg);
    gateway::configure(cfg);
}
