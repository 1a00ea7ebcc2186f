use std::time::{Duration, Instant};

use actix_web::body::{self, BodyStream, SizedStream};
use actix_web::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{error_chain, GatewayError};
use crate::metrics::{PROXY_FAILURES_TOTAL, PROXY_LATENCY, PROXY_REQUESTS_TOTAL};
use crate::router::BackendTarget;

/// Inbound body chunks buffered ahead of the outbound connection.
const BODY_CHANNEL_CAPACITY: usize = 8;

/// Outbound URL: backend base URL + original path + original query, unmodified.
pub fn target_url(target: &BackendTarget, path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{}{}?{}", target.base_url, path, query),
        _ => format!("{}{}", target.base_url, path),
    }
}

/// Forward `req` to `target` and relay the backend's answer.
///
/// Exactly one attempt is made. The request body is pumped into the outbound
/// request as it arrives and the response body is handed back as a stream, so
/// neither side is buffered in full. Any status the backend returns, 5xx
/// included, is relayed as-is; only failing to get a response at all is an
/// error.
pub async fn forward(
    client: &reqwest::Client,
    req: &HttpRequest,
    payload: web::Payload,
    target: &BackendTarget,
    timeout: Duration,
) -> Result<HttpResponse, GatewayError> {
    let url = target_url(target, req.uri().path(), req.uri().query());
    let construction = |detail: String| GatewayError::RequestConstruction {
        service: target.name.clone(),
        detail,
    };

    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .map_err(|e| construction(format!("invalid method {}: {e}", req.method())))?;
    let parsed_url =
        reqwest::Url::parse(&url).map_err(|e| construction(format!("invalid URL {url}: {e}")))?;
    let headers = outbound_headers(req.headers()).map_err(construction)?;

    let mut outbound = client
        .request(method, parsed_url)
        .headers(headers)
        .timeout(timeout);
    if carries_body(req.headers()) {
        outbound = outbound.body(stream_body(payload));
    }

    tracing::debug!(service = %target.name, method = %req.method(), url = %url, "forwarding request");

    let started = Instant::now();
    let response = outbound.send().await.map_err(|e| {
        let kind = if e.is_builder() {
            "request"
        } else if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connect"
        } else {
            "transport"
        };
        PROXY_FAILURES_TOTAL
            .with_label_values(&[target.name.as_str(), kind])
            .inc();

        let detail = error_chain(&e);
        if e.is_builder() {
            construction(detail)
        } else {
            GatewayError::UpstreamUnavailable {
                service: target.name.clone(),
                detail,
            }
        }
    })?;
    PROXY_LATENCY.observe(started.elapsed().as_secs_f64());
    PROXY_REQUESTS_TOTAL
        .with_label_values(&[target.name.as_str(), response.status().as_str()])
        .inc();

    Ok(relay_response(response, &target.name))
}

/// Copy every inbound header, keeping all values of repeated headers.
///
/// `Host` names the gateway itself; the outbound request carries the
/// backend's authority instead, which reqwest derives from the URL.
fn outbound_headers(inbound: &HeaderMap) -> Result<reqwest::header::HeaderMap, String> {
    let mut headers = reqwest::header::HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound.iter() {
        if *name == header::HOST {
            continue;
        }
        let name = reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes())
            .map_err(|e| format!("invalid header name {name}: {e}"))?;
        let value = reqwest::header::HeaderValue::from_bytes(value.as_bytes())
            .map_err(|e| format!("invalid value for header {name}: {e}"))?;
        headers.append(name, value);
    }
    Ok(headers)
}

/// Whether the inbound request announces a body worth forwarding.
fn carries_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// Turn the inbound payload into a streaming outbound body.
///
/// `web::Payload` is tied to the worker thread, while reqwest needs a `Send`
/// stream, so a local task pumps chunks through a bounded channel. When the
/// outbound side goes away the send fails and the pump stops reading.
fn stream_body(mut payload: web::Payload) -> reqwest::Body {
    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(BODY_CHANNEL_CAPACITY);

    actix_web::rt::spawn(async move {
        while let Some(chunk) = payload.next().await {
            let chunk = chunk.map_err(|e| std::io::Error::other(e.to_string()));
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    });

    reqwest::Body::wrap_stream(ReceiverStream::new(rx))
}

/// How the relayed body is framed towards the client.
#[derive(Debug, PartialEq, Eq)]
enum Framing {
    /// Status forbids a body
    Empty,
    /// Backend announced the length; the client gets the same `Content-Length`
    Sized(u64),
    /// Length unknown, sent chunked
    Streamed,
}

fn framing(status: StatusCode, headers: &reqwest::header::HeaderMap) -> Framing {
    if status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
    {
        return Framing::Empty;
    }
    // Read from the header rather than the body size hint: a HEAD response
    // has an empty body but still announces the length of the resource.
    match headers
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        Some(len) => Framing::Sized(len),
        None => Framing::Streamed,
    }
}

/// Build the client response: same status, every header, body streamed.
///
/// The body is attached with `body()` rather than `streaming()`, which would
/// invent a `Content-Type` the backend never sent.
fn relay_response(response: reqwest::Response, service: &str) -> HttpResponse {
    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);

    for (name, value) in response.headers() {
        match (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(name), Ok(value)) => {
                builder.append_header((name, value));
            }
            _ => tracing::warn!(service = %service, header = %name, "dropping unrepresentable response header"),
        }
    }

    let kind = framing(status, response.headers());
    if kind == Framing::Empty {
        return builder.body(body::None::new());
    }

    let service = service.to_string();
    let stream = response.bytes_stream().inspect(move |chunk| {
        if let Err(e) = chunk {
            // Headers are already on the wire; all that is left is to abort.
            tracing::warn!(service = %service, error = %error_chain(e), "upstream body stream failed");
        }
    });

    match kind {
        Framing::Sized(len) => builder.body(SizedStream::new(len, stream)),
        _ => builder.body(BodyStream::new(stream)),
    }
}
