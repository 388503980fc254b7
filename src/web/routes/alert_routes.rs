use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::alerting::notifier::NotificationMessage;
use crate::alerting::evaluate_and_notify;
use crate::models::{Alert, AlertRule, AlertStatus, Incident, NotificationChannel};
use crate::telemetry::ALERTS_FIRING;
use crate::web::models::alert_models::{
    CreateAlertRuleRequest, CreateIncidentRequest, CreateNotificationChannelRequest,
    UpdateAlertRuleRequest, UpdateIncidentStatusRequest,
};
use crate::web::models::ApiParams;
use crate::web::{AppError, AppState};

pub fn create_alert_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/alert-rules", get(list_rules_handler).post(create_rule_handler))
        .route("/api/alert-rules/evaluate", post(evaluate_handler))
        .route(
            "/api/alert-rules/{id}",
            get(get_rule_handler).put(update_rule_handler).delete(delete_rule_handler),
        )
        .route("/api/alerts", get(list_alerts_handler))
        .route("/api/alerts/{id}/acknowledge", post(acknowledge_alert_handler))
        .route("/api/alerts/{id}/resolve", post(resolve_alert_handler))
        .route("/api/incidents", get(list_incidents_handler).post(create_incident_handler))
        .route("/api/incidents/{id}/status", put(update_incident_status_handler))
        .route(
            "/api/notification-channels",
            get(list_channels_handler).post(create_channel_handler),
        )
        .route(
            "/api/notification-channels/{id}",
            axum::routing::delete(delete_channel_handler),
        )
        .route("/api/notification-channels/{id}/test", post(test_channel_handler))
}

// --- Alert rules ---

async fn list_rules_handler(State(app_state): State<Arc<AppState>>) -> Json<Vec<AlertRule>> {
    Json(app_state.alert_store.list_rules().await)
}

async fn create_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateAlertRuleRequest>,
) -> Result<(StatusCode, Json<AlertRule>), AppError> {
    let rule = app_state.alert_store.create_rule(payload).await?;
    info!(rule_id = %rule.id, name = %rule.name, "Alert rule created.");
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn get_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AlertRule>, AppError> {
    Ok(Json(app_state.alert_store.get_rule(&id).await?))
}

/// Keeps `argus_alerts_firing` in step with changes made outside evaluation.
async fn refresh_firing_gauge(app_state: &AppState) {
    let firing = app_state.alert_store.firing_count().await;
    app_state.registry.set_gauge(ALERTS_FIRING, &[], firing as f64);
}

async fn update_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAlertRuleRequest>,
) -> Result<Json<AlertRule>, AppError> {
    let rule = app_state.alert_store.update_rule(&id, payload).await?;
    refresh_firing_gauge(&app_state).await;
    Ok(Json(rule))
}

async fn delete_rule_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app_state.alert_store.delete_rule(&id).await?;
    refresh_firing_gauge(&app_state).await;
    info!(rule_id = %id, "Alert rule deleted.");
    Ok(StatusCode::NO_CONTENT)
}

async fn evaluate_handler(State(app_state): State<Arc<AppState>>) -> Json<Value> {
    let (summary, deliveries) = evaluate_and_notify(
        &app_state.alert_store,
        &app_state.registry,
        &app_state.notifier,
    )
    .await;
    Json(json!({ "summary": summary, "deliveries": deliveries }))
}

// --- Alerts ---

async fn list_alerts_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Result<Json<Vec<Alert>>, AppError> {
    let status = match params.status() {
        Some(raw) => Some(
            serde_json::from_value::<AlertStatus>(Value::String(raw.to_ascii_lowercase()))
                .map_err(|_| AppError::InvalidInput(format!("unknown alert status '{raw}'")))?,
        ),
        None => None,
    };
    Ok(Json(app_state.alert_store.list_alerts(status).await))
}

async fn acknowledge_alert_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, AppError> {
    let alert = app_state.alert_store.acknowledge_alert(&id).await?;
    refresh_firing_gauge(&app_state).await;
    Ok(Json(alert))
}

async fn resolve_alert_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, AppError> {
    let alert = app_state.alert_store.resolve_alert(&id).await?;
    refresh_firing_gauge(&app_state).await;
    Ok(Json(alert))
}

// --- Incidents ---

async fn list_incidents_handler(State(app_state): State<Arc<AppState>>) -> Json<Vec<Incident>> {
    Json(app_state.alert_store.list_incidents().await)
}

async fn create_incident_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<Incident>), AppError> {
    let incident = app_state.alert_store.create_incident(payload).await?;
    info!(incident_id = %incident.id, title = %incident.title, "Incident opened.");
    Ok((StatusCode::CREATED, Json(incident)))
}

async fn update_incident_status_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateIncidentStatusRequest>,
) -> Result<Json<Incident>, AppError> {
    Ok(Json(app_state.alert_store.update_incident_status(&id, payload).await?))
}

// --- Notification channels ---

async fn list_channels_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<Vec<NotificationChannel>> {
    Json(app_state.alert_store.list_channels().await)
}

async fn create_channel_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateNotificationChannelRequest>,
) -> Result<(StatusCode, Json<NotificationChannel>), AppError> {
    let channel = app_state.alert_store.create_channel(payload).await?;
    info!(channel_id = %channel.id, channel_type = %channel.channel_type, "Notification channel created.");
    Ok((StatusCode::CREATED, Json(channel)))
}

async fn delete_channel_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app_state.alert_store.delete_channel(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn test_channel_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let channel = app_state.alert_store.get_channel(&id).await?;
    let record = app_state
        .notifier
        .deliver(&channel, &NotificationMessage::test_message(&channel))
        .await;
    Ok(Json(json!({ "success": !record.is_failure(), "delivery": record })))
}
