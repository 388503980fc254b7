use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::generators::{alerts, logs, traces};
use crate::lgtm::{run_integration_test, IntegrationReport, LgtmService, ServiceHealth, StackHealth};
use crate::web::models::ApiParams;
use crate::web::routes::generate_routes::push_result;
use crate::web::{AppError, AppState};

pub fn create_lgtm_router() -> Router<Arc<AppState>> {
    let mut router = Router::new()
        .route("/test-lgtm-integration", get(integration_handler))
        .route("/lgtm/status", get(status_handler))
        .route("/push-logs-to-loki", get(push_logs_handler).post(push_logs_handler))
        .route("/push-traces-to-tempo", get(push_traces_handler).post(push_traces_handler))
        .route(
            "/push-alerts-to-alertmanager",
            get(push_alerts_handler).post(push_alerts_handler),
        )
        .route("/query-prometheus", get(query_prometheus_handler))
        .route("/query-loki", get(query_loki_handler));

    // One route per backend: /test-prometheus, /test-loki, ...
    for service in LgtmService::ALL {
        router = router.route(
            &format!("/test-{}", service.as_str()),
            get(move |State(app_state): State<Arc<AppState>>| async move {
                check_service(&app_state, service).await
            }),
        );
    }
    router
}

async fn check_service(app_state: &AppState, service: LgtmService) -> Json<ServiceHealth> {
    let health = app_state.lgtm_client().await.check(service).await;
    info!(service = %service, status = ?health.status, latency_ms = health.latency_ms, "LGTM service checked.");
    Json(health)
}

async fn status_handler(State(app_state): State<Arc<AppState>>) -> Json<StackHealth> {
    Json(app_state.lgtm_client().await.check_all().await)
}

async fn integration_handler(State(app_state): State<Arc<AppState>>) -> Json<IntegrationReport> {
    let client = app_state.lgtm_client().await;
    let report = run_integration_test(&client).await;
    info!(status = ?report.status, duration_ms = report.duration_ms, "LGTM integration test finished.");
    Json(report)
}

async fn push_logs_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<Value> {
    let service = params.service();
    let entries = logs::generate_entries(&mut rand::rng(), params.count(), params.level(), service.as_deref());
    let result = app_state.lgtm_client().await.push_logs(&entries).await;
    if let Err(e) = &result {
        warn!(error = %e, "Pushing logs to Loki failed.");
    }
    Json(json!({ "count": entries.len(), "loki": push_result(result) }))
}

async fn push_traces_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<Value> {
    let service = params.service();
    let generated = traces::generate_traces(&mut rand::rng(), params.count(), service.as_deref());
    let span_count: usize = generated.iter().map(|t| t.spans.len()).sum();
    let result = app_state.lgtm_client().await.push_traces(&generated).await;
    if let Err(e) = &result {
        warn!(error = %e, "Pushing traces to Tempo failed.");
    }
    Json(json!({
        "count": generated.len(),
        "span_count": span_count,
        "trace_ids": generated.iter().map(|t| t.trace_id.as_str()).collect::<Vec<_>>(),
        "tempo": push_result(result),
    }))
}

async fn push_alerts_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<Value> {
    let generated = alerts::generate_alerts(&mut rand::rng(), params.count());
    let result = app_state.lgtm_client().await.push_alerts(&generated).await;
    if let Err(e) = &result {
        warn!(error = %e, "Pushing alerts to Alertmanager failed.");
    }
    Json(json!({ "count": generated.len(), "alertmanager": push_result(result) }))
}

async fn query_prometheus_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Result<Json<Value>, AppError> {
    let query = params.query().unwrap_or_else(|| "up".to_string());
    let data = app_state.lgtm_client().await.query_prometheus(&query).await?;
    Ok(Json(json!({ "query": query, "result": data })))
}

async fn query_loki_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Result<Json<Value>, AppError> {
    let client = app_state.lgtm_client().await;
    let query = params
        .query()
        .unwrap_or_else(|| format!("{{source=\"{}\"}}", client.settings().service_label));
    let data = client.query_loki(&query, params.limit()).await?;
    Ok(Json(json!({ "query": query, "result": data })))
}
