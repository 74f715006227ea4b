use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TRACE_ID_HEADER: &str = "x-trace-id";
pub const RESPONSE_TIME_HEADER: &str = "x-response-time-ms";

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Wraps every request in an `http_request` span and echoes (or mints)
/// request and trace ids on the response.
///
/// Status and status class are recorded on the span once the handler is
/// done, and the elapsed time is echoed in `x-response-time-ms`.
pub async fn request_context_middleware(request: Request, next: Next) -> Response {
    let request_id = incoming_or_new_id(request.headers(), REQUEST_ID_HEADER, "req");
    let trace_id = incoming_or_new_id(request.headers(), TRACE_ID_HEADER, "trace");
    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path(),
        status = tracing::field::Empty,
        status_class = tracing::field::Empty,
    );
    let started_at = Instant::now();

    let mut response = next.run(request).instrument(span.clone()).await;
    let elapsed_ms = started_at.elapsed().as_millis();

    let headers = response.headers_mut();
    insert_header(headers, REQUEST_ID_HEADER, &request_id);
    insert_header(headers, TRACE_ID_HEADER, &trace_id);
    insert_header(headers, RESPONSE_TIME_HEADER, &elapsed_ms.to_string());

    let status = response.status();
    let class = status_class(status);
    span.record("status", status.as_u16());
    span.record("status_class", class);
    match class {
        "server_error" => tracing::warn!(parent: &span, elapsed_ms, "request failed"),
        "client_error" => tracing::info!(parent: &span, elapsed_ms, "request rejected"),
        _ => tracing::info!(parent: &span, elapsed_ms, "request completed"),
    }

    response
}

fn status_class(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "server_error"
    } else if status.is_client_error() {
        "client_error"
    } else if status.is_redirection() {
        "redirect"
    } else {
        "success"
    }
}

fn incoming_or_new_id(headers: &HeaderMap, header_name: &'static str, prefix: &str) -> String {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| new_id(prefix))
}

fn new_id(prefix: &str) -> String {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_millis())
        .unwrap_or_default();
    let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{now_ms:x}-{seq:08x}")
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}
