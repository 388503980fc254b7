use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::load::{
    run_load_test, DashboardLoadWorkload, LoadTestConfig, LoadTestReport, LogsScaleWorkload,
    MetricsScaleWorkload, TracesScaleWorkload, Workload,
};
use crate::web::models::ApiParams;
use crate::web::AppState;

pub fn create_load_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/test-metrics-scale", get(metrics_scale_handler))
        .route("/test-logs-scale", get(logs_scale_handler))
        .route("/test-traces-scale", get(traces_scale_handler))
        .route("/test-dashboard-load", get(dashboard_load_handler))
}

async fn run(app_state: &AppState, workload: Arc<dyn Workload>, params: &ApiParams) -> Json<LoadTestReport> {
    let config = LoadTestConfig {
        duration: params.duration(),
        concurrency: params.concurrency(),
    };
    Json(run_load_test(workload, config, app_state.registry.clone()).await)
}

async fn metrics_scale_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<LoadTestReport> {
    let workload = Arc::new(MetricsScaleWorkload::new(app_state.registry.clone()));
    run(&app_state, workload, &params).await
}

async fn logs_scale_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<LoadTestReport> {
    let workload = Arc::new(LogsScaleWorkload::new(app_state.registry.clone()));
    run(&app_state, workload, &params).await
}

async fn traces_scale_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<LoadTestReport> {
    let workload = Arc::new(TracesScaleWorkload::new(app_state.registry.clone()));
    run(&app_state, workload, &params).await
}

/// Hits Grafana and Prometheus with the configured URLs.
async fn dashboard_load_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<LoadTestReport> {
    let settings = app_state.settings.snapshot().await;
    let workload = Arc::new(DashboardLoadWorkload::new(app_state.http_client.clone(), &settings));
    run(&app_state, workload, &params).await
}
