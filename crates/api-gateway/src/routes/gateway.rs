use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::GatewayError;
use crate::metrics::ROUTE_MISSES_TOTAL;
use crate::proxy::forward;
use crate::state::AppState;

/// ANY path not claimed by the gateway's own endpoints: dispatch by prefix,
/// then forward to the owning backend.
pub async fn dispatch(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let target = state
        .config
        .routes
        .resolve(req.path())
        .inspect_err(|_| ROUTE_MISSES_TOTAL.inc())?;

    forward(
        &state.http_client,
        &req,
        payload,
        target,
        state.config.forward_timeout,
    )
    .await
}

/// Configure the proxy as the fallback for every unmatched path
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.default_service(web::to(dispatch));
}
