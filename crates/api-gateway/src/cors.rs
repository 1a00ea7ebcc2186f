//! CORS stage of the request pipeline.
//!
//! Runs ahead of routing: every response gets permissive cross-origin
//! headers, and `OPTIONS` requests are answered here with `204 No Content`
//! without ever reaching the dispatcher.

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{self, HeaderMap, HeaderValue};
use actix_web::http::Method;
use actix_web::middleware::Next;
use actix_web::HttpResponse;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Origin, Content-Type, Authorization";

/// Outcome of a pipeline stage.
pub enum Flow {
    /// Hand the request to the next stage
    Next,
    /// Stop here and answer with this response
    Respond(HttpResponse),
}

/// Preflight decision, by method only: any path, routed or not, is accepted.
pub fn preflight(method: &Method) -> Flow {
    if *method == Method::OPTIONS {
        Flow::Respond(HttpResponse::NoContent().finish())
    } else {
        Flow::Next
    }
}

/// Add the CORS headers. A header the backend already set is left alone so
/// proxied responses stay verbatim.
pub fn apply_headers(headers: &mut HeaderMap) {
    for (name, value) in [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN),
        (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
    ] {
        if !headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
}

/// Middleware entry point, mounted with `middleware::from_fn(cors_stage)`.
pub async fn cors_stage(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let mut res = match preflight(req.method()) {
        Flow::Respond(response) => req.into_response(response),
        Flow::Next => next.call(req).await?.map_into_boxed_body(),
    };
    apply_headers(res.headers_mut());
    Ok(res)
}
