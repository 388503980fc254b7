use axum::http::{Method, StatusCode};
use serde_json::json;

use argus::server::config::ServerConfig;

use crate::helpers::{test_config, TestApp};

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new(test_config());
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "argus");
}

#[tokio::test]
async fn metrics_exposes_request_counters() {
    let app = TestApp::new(test_config());
    app.get("/health").await;
    let (status, text) = app.raw(Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("# TYPE argus_http_requests_total counter"));
    assert!(text.contains("route=\"/health\""));
}

#[tokio::test]
async fn info_lists_every_simulation_scenario() {
    let app = TestApp::new(test_config());
    let (status, body) = app.get("/api/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoint_groups"]["simulate"].as_array().unwrap().len(), 12);
    assert_eq!(body["settings"]["grafana_api_key"], serde_json::Value::Null);
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = TestApp::new(test_config());
    let (status, _) = app.get("/definitely/not/here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rate_limiter_rejects_with_429() {
    let mut config = test_config();
    config.rate_limit_per_second = 1;
    config.rate_limit_burst = 1;
    let app = TestApp::new(config);

    let (first, _) = app.get("/health").await;
    let (second, body) = app.get("/health").await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn simulate_runs_known_scenario() {
    let app = TestApp::new(test_config());
    let (status, body) = app.get("/simulate/web-service?count=25&error_rate=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scenario"], "web-service");
    assert_eq!(body["requests"], 25);
    assert_eq!(body["errors"], 0);
    assert_eq!(
        app.state.registry.value_of("argus_simulated_requests_total"),
        Some(25.0)
    );
}

#[tokio::test]
async fn slow_request_times_out_with_408() {
    let app = TestApp::new(ServerConfig {
        request_timeout_secs: 1,
        ..test_config()
    });
    // every simulated request carries 5 s of extra latency and the handler sleeps for the average
    let (status, _) = app.raw(Method::GET, "/simulate/cache?count=1&latency=5000&sleep=true", None).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn simulate_unknown_scenario_is_404() {
    let app = TestApp::new(test_config());
    let (status, body) = app.get("/simulate/meteor-strike").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("meteor-strike"));

    let (status, body) = app.get("/simulate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scenarios"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn apm_views_return_data() {
    let app = TestApp::new(test_config());
    let (_, services) = app.get("/api/apm/services?service=order-service").await;
    assert_eq!(services["services"].as_array().unwrap().len(), 1);

    let (_, traces) = app.get("/api/apm/traces?limit=3").await;
    assert_eq!(traces["count"], 3);

    let (_, map) = app.get("/api/apm/service-map").await;
    assert_eq!(map["edges"].as_array().unwrap().len(), 8);
    assert!(!map["nodes"].as_array().unwrap().is_empty());

    let (status, logs) = app.get("/api/logs?limit=5&level=error").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs["count"], 5);
    assert!(logs["logs"].as_array().unwrap().iter().all(|l| l["level"] == "error"));
}

#[tokio::test]
async fn dashboard_summary_counts_alerting_state() {
    let app = TestApp::new(test_config());
    app.post(
        "/api/alert-rules",
        json!({ "name": "r", "metric": "m", "comparison_operator": ">", "threshold": 1.0 }),
    )
    .await;
    let (status, body) = app.get("/api/dashboard/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alert_rules"]["total"], 1);
    assert_eq!(body["alerts"]["firing"], 0);
}
