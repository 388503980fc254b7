use axum::{
    body::Body as AxumBody,
    extract::{MatchedPath, State},
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::telemetry::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_MS};
use crate::web::AppState;

/// Label for requests that matched no route (static files, 404s).
const UNMATCHED_ROUTE: &str = "unmatched";

/// Method label; extension methods share one series.
fn method_label(method: &Method) -> &'static str {
    const STANDARD: [&str; 9] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "CONNECT", "TRACE"];
    STANDARD
        .iter()
        .find(|m| **m == method.as_str())
        .copied()
        .unwrap_or("other")
}

/// Counts requests and records latency, labelled by route template rather than
/// raw path so ids do not explode cardinality.
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    req: Request<AxumBody>,
    next: Next,
) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let method = method_label(req.method());
    let started = Instant::now();

    let response = next.run(req).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = response.status().as_u16().to_string();
    state.registry.inc_counter(
        HTTP_REQUESTS_TOTAL,
        &[("method", method), ("route", route.as_str()), ("status", status.as_str())],
        1.0,
    );
    state.registry.observe(
        HTTP_REQUEST_DURATION_MS,
        &[("method", method), ("route", route.as_str())],
        elapsed_ms,
    );
    response
}
