use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::helpers::{lgtm_config, test_config, TestApp};

#[tokio::test]
async fn settings_are_redacted() {
    let app = TestApp::new(lgtm_config("http://lgtm.internal"));
    let (status, body) = app.get("/api/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["grafana_api_key"], "********");
    assert_eq!(body["loki_url"], "http://lgtm.internal");
}

#[tokio::test]
async fn update_validates_and_applies() {
    let app = TestApp::new(test_config());
    let (status, body) = app
        .call(
            Method::PUT,
            "/api/settings",
            Some(json!({ "loki_url": "http://loki.example:3100/", "service_label": "checkout" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loki_url"], "http://loki.example:3100");
    assert_eq!(body["service_label"], "checkout");

    let (status, body) = app
        .call(Method::PUT, "/api/settings", Some(json!({ "tempo_url": "ftp://nope" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("tempo_url"));

    let (status, _) = app
        .post("/api/settings", json!({ "health_check_timeout_secs": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Failed updates leave the earlier change in place.
    let (_, current) = app.get("/api/settings").await;
    assert_eq!(current["service_label"], "checkout");
}

#[tokio::test]
async fn wrong_shape_body_is_422_and_changes_nothing() {
    let app = TestApp::new(test_config());
    let (status, _) = app
        .call(Method::PUT, "/api/settings", Some(json!("not-an-object")))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = app
        .call(Method::PUT, "/api/settings", Some(json!({ "health_check_timeout_secs": "soon" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, current) = app.get("/api/settings").await;
    assert_eq!(current["prometheus_url"], "http://localhost:9090");
}

#[tokio::test]
async fn reset_restores_startup_values() {
    let app = TestApp::new(test_config());
    app.post("/api/settings", json!({ "prometheus_url": "http://elsewhere:9090" })).await;
    let (status, body) = app.post("/api/settings/reset", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prometheus_url"], "http://localhost:9090");
}
