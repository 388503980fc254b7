use argus::server::config::ServerConfig;
use argus::web::{create_axum_router, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Defaults with limiting and background evaluation switched off.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        static_dir: "tests/no-static-dir".to_string(),
        rate_limit_per_second: 0,
        alert_evaluation_interval_secs: 0,
        health_check_timeout_secs: 2,
        ..ServerConfig::default()
    }
}

/// Every LGTM URL pointed at `base`.
pub fn lgtm_config(base: &str) -> ServerConfig {
    ServerConfig {
        prometheus_url: base.to_string(),
        loki_url: base.to_string(),
        tempo_url: base.to_string(),
        tempo_otlp_url: base.to_string(),
        grafana_url: base.to_string(),
        alertmanager_url: base.to_string(),
        grafana_api_key: Some("test-key".to_string()),
        ..test_config()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn new(config: ServerConfig) -> Self {
        let state = Arc::new(AppState::new(config).unwrap());
        Self {
            router: create_axum_router(state.clone()),
            state,
        }
    }

    pub async fn raw(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Non-JSON bodies come back as `Value::Null`.
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, text) = self.raw(method, uri, body).await;
        (status, serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body)).await
    }
}
