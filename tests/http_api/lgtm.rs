use axum::http::StatusCode;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{lgtm_config, test_config, TestApp};

async fn ready_stack() -> MockServer {
    let server = MockServer::start().await;
    for probe in ["/-/ready", "/ready"] {
        Mock::given(method("GET"))
            .and(path(probe))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn status_is_healthy_when_every_probe_answers() {
    let server = ready_stack().await;
    let app = TestApp::new(lgtm_config(&server.uri()));

    let (status, body) = app.get("/lgtm/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["overall"], "healthy");
    assert_eq!(body["services"].as_array().unwrap().len(), 5);

    let (_, settings_check) = app.get("/api/settings/test-connection").await;
    assert_eq!(settings_check["overall"], "healthy");
}

#[tokio::test]
async fn single_service_probe_routes() {
    let server = ready_stack().await;
    let app = TestApp::new(lgtm_config(&server.uri()));

    for service in ["prometheus", "loki", "tempo", "grafana", "alertmanager"] {
        let (status, body) = app.get(&format!("/test-{service}")).await;
        assert_eq!(status, StatusCode::OK, "{service}");
        assert_eq!(body["service"], service);
        assert_eq!(body["status"], "online", "{service}");
    }
}

#[tokio::test]
async fn unreachable_stack_is_unhealthy_but_200() {
    let mut config = test_config();
    for url in [
        &mut config.prometheus_url,
        &mut config.loki_url,
        &mut config.tempo_url,
        &mut config.grafana_url,
        &mut config.alertmanager_url,
    ] {
        *url = "http://127.0.0.1:9".to_string();
    }
    let app = TestApp::new(config);
    let (status, body) = app.get("/lgtm/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["overall"], "unhealthy");
}

#[tokio::test]
async fn push_endpoints_report_acceptance() {
    let server = MockServer::start().await;
    for (route, code) in [("/loki/api/v1/push", 204), ("/v1/traces", 200), ("/api/v2/alerts", 200)] {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(code))
            .mount(&server)
            .await;
    }
    let app = TestApp::new(lgtm_config(&server.uri()));

    let (status, logs) = app.get("/push-logs-to-loki?count=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs["loki"]["success"], true);
    assert_eq!(logs["loki"]["summary"]["accepted"], 5);

    let (_, traces) = app.get("/push-traces-to-tempo?count=2").await;
    assert_eq!(traces["tempo"]["success"], true);
    assert_eq!(traces["tempo"]["summary"]["accepted"], traces["span_count"]);

    let (_, alerts) = app.get("/push-alerts-to-alertmanager?count=3").await;
    assert_eq!(alerts["alertmanager"]["summary"]["status_code"], 200);
}

#[tokio::test]
async fn rejected_push_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("entry out of order"))
        .mount(&server)
        .await;
    let app = TestApp::new(lgtm_config(&server.uri()));

    let (status, body) = app.get("/push-logs-to-loki?count=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loki"]["success"], false);
    assert!(body["loki"]["error"].as_str().unwrap().contains("entry out of order"));
}

#[tokio::test]
async fn query_proxies_and_upstream_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(query_param("query", "up"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "data": { "resultType": "vector", "result": [] },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .and(query_param("query", "{source=\"argus\"}"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let app = TestApp::new(lgtm_config(&server.uri()));

    let (status, body) = app.get("/query-prometheus").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "up");
    assert_eq!(body["result"]["status"], "success");

    let (status, body) = app.get("/query-loki?limit=10").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn integration_test_passes_against_healthy_stack() {
    let server = ready_stack().await;
    for route in ["/loki/api/v1/push", "/v1/traces", "/api/v2/alerts"] {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "success" })))
        .mount(&server)
        .await;
    let app = TestApp::new(lgtm_config(&server.uri()));

    let (status, body) = app.get("/test-lgtm-integration").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "passed");
    assert_eq!(body["steps"].as_array().unwrap().len(), 5);
}
