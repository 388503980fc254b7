use axum::http::StatusCode;
use std::time::Instant;

use crate::helpers::{test_config, TestApp};

#[tokio::test]
async fn metrics_scale_respects_worker_count() {
    let app = TestApp::new(test_config());
    let started = Instant::now();
    let (status, body) = app.get("/test-metrics-scale?duration=1&concurrency=3").await;
    let elapsed = started.elapsed();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scenario"], "metrics-scale");
    assert_eq!(body["workers"], 3);
    assert!(body["peak_active_workers"].as_u64().unwrap() <= 3);
    assert_eq!(body["per_worker_operations"].as_array().unwrap().len(), 3);
    assert!(body["total_operations"].as_u64().unwrap() > 0);
    assert!(elapsed.as_secs_f64() >= 1.0);
    assert!(elapsed.as_secs_f64() < 5.0);
}

#[tokio::test]
async fn concurrency_is_clamped_to_maximum() {
    let app = TestApp::new(test_config());
    let (_, body) = app.get("/test-logs-scale?duration=1&concurrency=500").await;
    assert_eq!(body["workers"], 50);
    assert!(body["peak_active_workers"].as_u64().unwrap() <= 50);
}

#[tokio::test]
async fn traces_scale_records_operations() {
    let app = TestApp::new(test_config());
    let (_, body) = app.get("/test-traces-scale?duration=1&concurrency=2").await;
    assert_eq!(body["scenario"], "traces-scale");
    assert_eq!(body["errors"], 0);
    assert!(app.state.registry.value_of("argus_load_test_operations_total").unwrap() > 0.0);
}

#[tokio::test]
async fn dashboard_load_counts_errors_against_unreachable_grafana() {
    let mut config = test_config();
    config.grafana_url = "http://127.0.0.1:9".to_string();
    config.prometheus_url = "http://127.0.0.1:9".to_string();
    let app = TestApp::new(config);

    let (status, body) = app.get("/test-dashboard-load?duration=1&concurrency=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scenario"], "dashboard-load");
    assert!(body["errors"].as_u64().unwrap() > 0);
}
