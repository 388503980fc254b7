use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use std::collections::BTreeMap;

use super::{hex_id, pick, round2, skewed, ENDPOINTS, SERVICES};
use crate::models::{APMData, SpanKind, Trace};

const MAX_CHILD_SPANS: usize = 6;
const SPAN_ERROR_PROBABILITY: f64 = 0.05;

const DOWNSTREAM_OPERATIONS: &[(&str, SpanKind)] = &[
    ("SELECT orders", SpanKind::Client),
    ("INSERT payments", SpanKind::Client),
    ("cache.get", SpanKind::Client),
    ("cache.set", SpanKind::Client),
    ("POST /charge", SpanKind::Client),
    ("GET /users/{id}", SpanKind::Client),
    ("publish order.created", SpanKind::Producer),
    ("render_response", SpanKind::Internal),
];

/// One trace: a server root span and 1..=6 children nested inside it.
pub fn generate_trace<R: Rng + ?Sized>(rng: &mut R, root_service: Option<&str>) -> Trace {
    let trace_id = hex_id(rng, 16);
    let root_service = root_service
        .map(str::to_string)
        .unwrap_or_else(|| pick(rng, SERVICES).to_string());
    let root_duration = round2(skewed(rng, 20.0, 800.0));
    let root_start = Utc::now() - ChronoDuration::microseconds((root_duration * 1000.0).round() as i64);
    let root_span_id = hex_id(rng, 8);
    let endpoint = pick(rng, ENDPOINTS);

    let child_count = rng.random_range(1..=MAX_CHILD_SPANS);
    let mut spans = Vec::with_capacity(child_count + 1);
    let mut any_child_error = false;

    for _ in 0..child_count {
        let (operation, kind) = *pick(rng, DOWNSTREAM_OPERATIONS);
        // Children start in the first 80% of the parent and end before it does.
        let offset = round2(rng.random_range(0.0..=root_duration * 0.8));
        let remaining = root_duration - offset;
        let duration = round2(rng.random_range(0.1..=remaining.max(0.1))).min(remaining);
        let error = rng.random_bool(SPAN_ERROR_PROBABILITY);
        any_child_error |= error;

        let mut tags = BTreeMap::new();
        tags.insert("component".to_string(), component_for(operation).to_string());
        spans.push(APMData {
            service_name: pick(rng, SERVICES).to_string(),
            trace_id: trace_id.clone(),
            span_id: hex_id(rng, 8),
            parent_span_id: Some(root_span_id.clone()),
            operation: operation.to_string(),
            kind,
            timestamp: root_start + ChronoDuration::microseconds((offset * 1000.0).round() as i64),
            duration_ms: duration,
            status_code: if error { 500 } else { 200 },
            error,
            tags,
        });
    }

    let root_error = any_child_error && rng.random_bool(0.5);
    let mut root_tags = BTreeMap::new();
    root_tags.insert("http.method".to_string(), "GET".to_string());
    root_tags.insert("http.route".to_string(), endpoint.to_string());
    spans.insert(
        0,
        APMData {
            service_name: root_service.clone(),
            trace_id: trace_id.clone(),
            span_id: root_span_id,
            parent_span_id: None,
            operation: format!("GET {endpoint}"),
            kind: SpanKind::Server,
            timestamp: root_start,
            duration_ms: root_duration,
            status_code: if root_error { 500 } else { 200 },
            error: root_error,
            tags: root_tags,
        },
    );

    Trace {
        trace_id,
        root_service,
        duration_ms: root_duration,
        spans,
    }
}

pub fn generate_traces<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    root_service: Option<&str>,
) -> Vec<Trace> {
    (0..count).map(|_| generate_trace(rng, root_service)).collect()
}

fn component_for(operation: &str) -> &'static str {
    if operation.starts_with("SELECT") || operation.starts_with("INSERT") {
        "postgresql"
    } else if operation.starts_with("cache") {
        "redis"
    } else if operation.starts_with("publish") {
        "kafka"
    } else if operation.starts_with("render") {
        "internal"
    } else {
        "http"
    }
}
