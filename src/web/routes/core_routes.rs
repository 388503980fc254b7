use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::models::{AlertStatus, IncidentStatus};
use crate::version::VERSION;
use crate::web::AppState;

/// Prometheus text exposition format 0.0.4.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn create_core_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/info", get(info_handler))
        .route("/api/dashboard/summary", get(dashboard_summary_handler))
}

async fn health_handler(State(app_state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "argus",
        "version": VERSION,
        "uptime_seconds": app_state.uptime_seconds(),
    }))
}

async fn metrics_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        app_state.registry.render(),
    )
}

async fn info_handler(State(app_state): State<Arc<AppState>>) -> Json<Value> {
    let settings = app_state.settings.snapshot().await.redacted();
    Json(json!({
        "name": "argus",
        "description": "Synthetic load generator and health validator for the LGTM stack",
        "version": VERSION,
        "started_at": app_state.started_at,
        "uptime_seconds": app_state.uptime_seconds(),
        "settings": settings,
        "endpoint_groups": {
            "core": ["/health", "/metrics", "/api/info", "/api/dashboard/summary"],
            "generate": ["/generate-metrics", "/generate-logs", "/generate-traces", "/generate-alerts", "/generate-incidents"],
            "simulate": crate::web::routes::simulate_routes::scenario_names().collect::<Vec<_>>(),
            "load": ["/test-metrics-scale", "/test-logs-scale", "/test-traces-scale", "/test-dashboard-load"],
            "lgtm": ["/test-lgtm-integration", "/lgtm/status", "/test-prometheus", "/test-loki", "/test-tempo", "/test-grafana", "/test-alertmanager", "/push-logs-to-loki", "/push-traces-to-tempo", "/push-alerts-to-alertmanager", "/query-prometheus", "/query-loki"],
            "alerting": ["/api/alert-rules", "/api/alerts", "/api/incidents", "/api/notification-channels"],
            "apm": ["/api/apm/services", "/api/apm/traces", "/api/apm/service-map", "/api/logs"],
            "settings": ["/api/settings", "/api/settings/reset", "/api/settings/test-connection"],
        },
    }))
}

async fn dashboard_summary_handler(State(app_state): State<Arc<AppState>>) -> Json<Value> {
    let store = &app_state.alert_store;
    let rules = store.list_rules().await;
    let alerts = store.list_alerts(None).await;
    let incidents = store.list_incidents().await;
    let count_alerts = |status: AlertStatus| alerts.iter().filter(|a| a.status == status).count();

    Json(json!({
        "alert_rules": {
            "total": rules.len(),
            "enabled": rules.iter().filter(|r| r.enabled).count(),
        },
        "alerts": {
            "firing": count_alerts(AlertStatus::Firing),
            "acknowledged": count_alerts(AlertStatus::Acknowledged),
            "resolved": count_alerts(AlertStatus::Resolved),
        },
        "incidents": {
            "total": incidents.len(),
            "open": incidents.iter().filter(|i| i.status != IncidentStatus::Resolved).count(),
        },
        "notification_channels": store.list_channels().await.len(),
        "metrics": {
            "series": app_state.registry.series_count(),
            "families": app_state.registry.family_count(),
        },
        "uptime_seconds": app_state.uptime_seconds(),
    }))
}
