use axum::{
    http::{Method, StatusCode},
    middleware as axum_middleware, Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::alerting::{AlertStore, NotificationDispatcher};
use crate::lgtm::LgtmClient;
use crate::server::config::ServerConfig;
use crate::server::settings::{Settings, SettingsStore};
use crate::telemetry::{describe_builtin_metrics, MetricsRegistry};
use crate::version::VERSION;
use crate::web::middleware::rate_limit::RateLimiter;
use crate::web::routes::*;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod validation;

pub use error::AppError;

pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub settings: Arc<SettingsStore>,
    pub registry: Arc<MetricsRegistry>,
    pub alert_store: Arc<AlertStore>,
    pub notifier: Arc<NotificationDispatcher>,
    pub http_client: reqwest::Client,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(format!("argus/{VERSION}"))
            .build()?;
        let registry = Arc::new(MetricsRegistry::new());
        describe_builtin_metrics(&registry);

        Ok(Self {
            settings: Arc::new(SettingsStore::new(Settings::from_config(&config))),
            alert_store: Arc::new(AlertStore::new()),
            notifier: Arc::new(NotificationDispatcher::new(http_client.clone(), registry.clone())),
            rate_limiter: Arc::new(RateLimiter::new(
                config.rate_limit_per_second,
                config.rate_limit_burst,
            )),
            registry,
            http_client,
            config: Arc::new(config),
            started_at: Utc::now(),
        })
    }

    /// Client bound to the settings as they are right now.
    pub async fn lgtm_client(&self) -> LgtmClient {
        LgtmClient::new(self.http_client.clone(), self.settings.snapshot().await)
            .with_registry(self.registry.clone())
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);
    let request_timeout = Duration::from_secs(app_state.config.request_timeout_secs.max(1));

    Router::new()
        .merge(core_routes::create_core_router())
        .merge(generate_routes::create_generate_router())
        .nest("/simulate", simulate_routes::create_simulate_router())
        .merge(load_routes::create_load_router())
        .merge(lgtm_routes::create_lgtm_router())
        .merge(alert_routes::create_alert_router())
        .nest("/api/apm", apm_routes::create_apm_router())
        .route("/api/logs", axum::routing::get(apm_routes::logs_handler))
        .nest("/api/settings", settings_routes::create_settings_router())
        .fallback_service(ServeDir::new(&app_state.config.static_dir))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::request_metrics::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
