use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::generators::{alerts, logs, metrics, traces};
use crate::lgtm::{LgtmError, PushSummary};
use crate::telemetry::{
    GENERATED_ALERTS_TOTAL, GENERATED_LOGS_TOTAL, GENERATED_SPANS_TOTAL, TRACE_SPAN_DURATION_MS,
};
use crate::web::models::ApiParams;
use crate::web::AppState;

pub fn create_generate_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate-metrics", get(generate_metrics_handler))
        .route("/generate-logs", get(generate_logs_handler))
        .route("/generate-traces", get(generate_traces_handler))
        .route("/generate-alerts", get(generate_alerts_handler))
        .route("/generate-incidents", get(generate_incidents_handler))
}

/// Push outcome embedded in a 200 response; LGTM failures never fail the request.
pub(crate) fn push_result(result: Result<PushSummary, LgtmError>) -> Value {
    match result {
        Ok(summary) => json!({ "success": true, "summary": summary }),
        Err(e) => json!({ "success": false, "error": e.to_string() }),
    }
}

async fn generate_metrics_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<Value> {
    let count = params.count();
    let samples = metrics::generate_samples(&mut rand::rng(), count);
    metrics::record_samples(&app_state.registry, &samples);
    info!(count, "Generated metric samples.");

    Json(json!({
        "count": samples.len(),
        "families": metrics::family_names().collect::<Vec<_>>(),
        "samples": samples,
    }))
}

async fn generate_logs_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<Value> {
    let service = params.service();
    let entries = logs::generate_entries(&mut rand::rng(), params.count(), params.level(), service.as_deref());
    for entry in &entries {
        logs::emit(entry);
    }
    app_state.registry.inc_counter(GENERATED_LOGS_TOTAL, &[], entries.len() as f64);

    let mut body = json!({ "count": entries.len() });
    if params.push() {
        let client = app_state.lgtm_client().await;
        body["loki"] = push_result(client.push_logs(&entries).await);
    }
    body["logs"] = json!(entries);
    Json(body)
}

async fn generate_traces_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<Value> {
    let service = params.service();
    let generated = traces::generate_traces(&mut rand::rng(), params.count(), service.as_deref());
    let mut span_count = 0;
    for span in generated.iter().flat_map(|t| t.spans.iter()) {
        app_state.registry.observe(
            TRACE_SPAN_DURATION_MS,
            &[("service", span.service_name.as_str())],
            span.duration_ms,
        );
        span_count += 1;
    }
    app_state.registry.inc_counter(GENERATED_SPANS_TOTAL, &[], span_count as f64);

    let mut body = json!({ "count": generated.len(), "span_count": span_count });
    if params.push() {
        let client = app_state.lgtm_client().await;
        body["tempo"] = push_result(client.push_traces(&generated).await);
    }
    body["traces"] = json!(generated);
    Json(body)
}

async fn generate_alerts_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<Value> {
    let generated = alerts::generate_alerts(&mut rand::rng(), params.count());
    app_state.registry.inc_counter(GENERATED_ALERTS_TOTAL, &[], generated.len() as f64);

    let mut body = json!({ "count": generated.len() });
    if params.push() {
        let client = app_state.lgtm_client().await;
        body["alertmanager"] = push_result(client.push_alerts(&generated).await);
    }
    body["alerts"] = json!(generated);
    Json(body)
}

async fn generate_incidents_handler(Query(params): Query<ApiParams>) -> Json<Value> {
    let incidents = alerts::generate_incidents(&mut rand::rng(), params.count());
    Json(json!({
        "count": incidents.len(),
        "incidents": incidents,
    }))
}
