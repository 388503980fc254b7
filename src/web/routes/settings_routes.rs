use axum::{extract::State, routing::{get, post}, Json, Router};
use std::sync::Arc;
use tracing::info;

use crate::lgtm::StackHealth;
use crate::server::settings::{Settings, SettingsUpdate};
use crate::web::{AppError, AppState};

pub fn create_settings_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(get_settings_handler)
                .put(update_settings_handler)
                .post(update_settings_handler),
        )
        .route("/reset", post(reset_settings_handler))
        .route("/test-connection", get(test_connection_handler).post(test_connection_handler))
}

async fn get_settings_handler(State(app_state): State<Arc<AppState>>) -> Json<Settings> {
    Json(app_state.settings.snapshot().await.redacted())
}

async fn update_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Settings>, AppError> {
    let updated = app_state.settings.update(update).await?;
    info!(
        prometheus = %updated.prometheus_url,
        loki = %updated.loki_url,
        tempo = %updated.tempo_url,
        grafana = %updated.grafana_url,
        alertmanager = %updated.alertmanager_url,
        "Settings updated."
    );
    Ok(Json(updated.redacted()))
}

async fn reset_settings_handler(State(app_state): State<Arc<AppState>>) -> Json<Settings> {
    info!("Settings reset to startup values.");
    Json(app_state.settings.reset().await.redacted())
}

async fn test_connection_handler(State(app_state): State<Arc<AppState>>) -> Json<StackHealth> {
    Json(app_state.lgtm_client().await.check_all().await)
}
