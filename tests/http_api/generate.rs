use axum::http::StatusCode;

use crate::helpers::{test_config, TestApp};

#[tokio::test]
async fn generate_metrics_clamps_count() {
    let app = TestApp::new(test_config());
    let (status, body) = app.get("/generate-metrics?count=999999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 10_000);

    let (_, body) = app.get("/generate-metrics?count=banana").await;
    assert_eq!(body["count"], 100);

    let (_, body) = app.get("/generate-metrics?count=0").await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn generate_logs_honours_filters() {
    let app = TestApp::new(test_config());
    let (status, body) = app.get("/generate-logs?count=7&level=warn&service=auth-service").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 7);
    for log in body["logs"].as_array().unwrap() {
        assert_eq!(log["level"], "warn");
        assert_eq!(log["service"], "auth-service");
    }
    assert!(body.get("loki").is_none());
}

#[tokio::test]
async fn generate_traces_reports_spans() {
    let app = TestApp::new(test_config());
    let (_, body) = app.get("/generate-traces?count=4").await;
    let traces = body["traces"].as_array().unwrap();
    assert_eq!(traces.len(), 4);
    let spans: usize = traces.iter().map(|t| t["spans"].as_array().unwrap().len()).sum();
    assert_eq!(body["span_count"], spans);
}

#[tokio::test]
async fn generate_alerts_and_incidents() {
    let app = TestApp::new(test_config());
    let (_, alerts) = app.get("/generate-alerts?count=3").await;
    assert_eq!(alerts["alerts"].as_array().unwrap().len(), 3);

    let (_, incidents) = app.get("/generate-incidents?count=2").await;
    assert_eq!(incidents["count"], 2);
}

#[tokio::test]
async fn push_failure_still_answers_200() {
    let mut config = test_config();
    // Nothing listens on the discard port.
    config.loki_url = "http://127.0.0.1:9".to_string();
    let app = TestApp::new(config);

    let (status, body) = app.get("/generate-logs?count=2&push=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loki"]["success"], false);
    assert!(body["loki"]["error"].is_string());
}
