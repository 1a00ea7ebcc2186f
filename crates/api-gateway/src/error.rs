use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

/// Failures the request pipeline turns into a structured JSON response.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No configured prefix matches the request path
    #[error("no route matches path {0}")]
    RouteNotFound(String),
    /// The backend could not be reached or did not answer in time
    #[error("{service} unavailable: {detail}")]
    UpstreamUnavailable { service: String, detail: String },
    /// The outbound request could not be built from the inbound one
    #[error("failed to build request for {service}: {detail}")]
    RequestConstruction { service: String, detail: String },
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::RequestConstruction { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            GatewayError::RouteNotFound(path) => {
                tracing::debug!(path = %path, "no route for request");
                HttpResponse::NotFound().json(serde_json::json!({
                    "status": "error",
                    "message": "Endpoint not found",
                    "error": self.to_string(),
                }))
            }
            GatewayError::UpstreamUnavailable { service, detail } => {
                tracing::warn!(service = %service, error = %detail, "upstream unavailable");
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "status": "error",
                    "message": "Service unavailable",
                    "details": detail,
                }))
            }
            GatewayError::RequestConstruction { service, detail } => {
                tracing::error!(service = %service, error = %detail, "failed to build upstream request");
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "status": "error",
                    "message": "Failed to create request",
                    "details": detail,
                }))
            }
        }
    }
}

/// Render an error together with its `source()` chain, e.g.
/// `error sending request: client error (Connect): tcp connect error: Connection refused`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
