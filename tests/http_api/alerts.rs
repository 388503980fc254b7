use axum::http::{Method, StatusCode};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use argus::telemetry::ALERTS_FIRING;

use crate::helpers::{test_config, TestApp};

fn cpu_rule(channel_ids: Vec<String>) -> serde_json::Value {
    json!({
        "name": "CPU saturated",
        "metric": "argus_simulated_cpu_percent",
        "comparison_operator": ">",
        "threshold": 80.0,
        "severity": "critical",
        "notification_channel_ids": channel_ids,
    })
}

#[tokio::test]
async fn rule_crud_and_unknown_ids() {
    let app = TestApp::new(test_config());
    let (status, rule) = app.post("/api/alert-rules", cpu_rule(vec![])).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = rule["id"].as_str().unwrap().to_string();

    let (status, updated) = app
        .call(Method::PUT, &format!("/api/alert-rules/{id}"), Some(json!({ "threshold": 95.0 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["threshold"], 95.0);
    assert_eq!(updated["name"], "CPU saturated");

    let (status, list) = app.get("/api/alert-rules").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = app.call(Method::DELETE, &format!("/api/alert-rules/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = app.get(&format!("/api/alert-rules/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn invalid_rule_is_400() {
    let app = TestApp::new(test_config());
    let (status, _) = app
        .post(
            "/api/alert-rules",
            json!({ "name": "bad", "metric": "m", "comparison_operator": "<>", "threshold": 1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn evaluation_fires_and_notifies_webhook() {
    let receiver = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    let app = TestApp::new(test_config());
    let (status, channel) = app
        .post(
            "/api/notification-channels",
            json!({
                "name": "ops",
                "channel_type": "Webhook",
                "config": { "url": format!("{}/hook", receiver.uri()) },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(channel["channel_type"], "webhook");
    let channel_id = channel["id"].as_str().unwrap().to_string();

    app.post("/api/alert-rules", cpu_rule(vec![channel_id])).await;
    // Drives argus_simulated_cpu_percent to 85..100.
    app.get("/simulate/cpu-spike?count=1").await;

    let (status, body) = app.post("/api/alert-rules/evaluate", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["evaluated"], 1);
    assert_eq!(body["summary"]["firing"], 1);
    assert_eq!(body["deliveries"][0]["status"], "sent");

    // Still firing: no second notification.
    let (_, again) = app.post("/api/alert-rules/evaluate", json!({})).await;
    assert_eq!(again["deliveries"].as_array().unwrap().len(), 0);

    let (_, firing) = app.get("/api/alerts?status=firing").await;
    let alerts = firing.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    let alert_id = alerts[0]["id"].as_str().unwrap().to_string();

    let (status, acked) = app.post(&format!("/api/alerts/{alert_id}/acknowledge"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(acked["status"], "acknowledged");

    let (_, resolved) = app.post(&format!("/api/alerts/{alert_id}/resolve"), json!({})).await;
    assert_eq!(resolved["status"], "resolved");
}

#[tokio::test]
async fn disabling_a_firing_rule_resolves_its_alert() {
    let app = TestApp::new(test_config());
    app.state.registry.set_gauge("queue_depth", &[], 100.0);
    let (_, rule) = app
        .post(
            "/api/alert-rules",
            json!({ "name": "Queue backlog", "metric": "queue_depth", "comparison_operator": ">", "threshold": 1.0 }),
        )
        .await;
    let id = rule["id"].as_str().unwrap().to_string();
    let (_, body) = app.post("/api/alert-rules/evaluate", json!({})).await;
    assert_eq!(body["summary"]["firing"], 1);
    assert_eq!(app.state.registry.value_of(ALERTS_FIRING), Some(1.0));

    let (status, updated) = app
        .call(Method::PUT, &format!("/api/alert-rules/{id}"), Some(json!({ "enabled": false })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["enabled"], false);
    assert_eq!(app.state.registry.value_of(ALERTS_FIRING), Some(0.0));

    app.state.registry.set_gauge("queue_depth", &[], 0.0);
    let (_, body) = app.post("/api/alert-rules/evaluate", json!({})).await;
    assert_eq!(body["summary"]["evaluated"], 0);
    let (_, firing) = app.get("/api/alerts?status=firing").await;
    assert!(firing.as_array().unwrap().is_empty());
    let (_, resolved) = app.get("/api/alerts?status=resolved").await;
    assert_eq!(resolved.as_array().unwrap().len(), 1);
    assert_eq!(app.state.registry.value_of(ALERTS_FIRING), Some(0.0));
}

#[tokio::test]
async fn undecodable_rule_body_is_rejected_by_the_extractor() {
    let app = TestApp::new(test_config());
    // no body and no content type
    let (status, _) = app.raw(Method::POST, "/api/alert-rules", None).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _) = app.post("/api/alert-rules", json!({ "name": "missing fields" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (_, rules) = app.get("/api/alert-rules").await;
    assert!(rules.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn alert_status_filter_rejects_unknown_value() {
    let app = TestApp::new(test_config());
    let (status, _) = app.get("/api/alerts?status=sleeping").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post("/api/alerts/nope/acknowledge", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn incident_lifecycle() {
    let app = TestApp::new(test_config());
    let (status, _) = app
        .post("/api/incidents", json!({ "title": "Checkout down", "alert_ids": ["missing"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, incident) = app
        .post("/api/incidents", json!({ "title": "Checkout down", "severity": "critical" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(incident["status"], "open");
    let id = incident["id"].as_str().unwrap().to_string();

    let (status, resolved) = app
        .call(
            Method::PUT,
            &format!("/api/incidents/{id}/status"),
            Some(json!({ "status": "resolved", "note": "rolled back" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(resolved["resolved_at"].is_string());
    let timeline = resolved["timeline"].as_array().unwrap();
    assert_eq!(
        timeline.last().unwrap()["message"],
        "Status changed from open to resolved: rolled back"
    );

    let (status, _) = app
        .call(Method::PUT, "/api/incidents/unknown/status", Some(json!({ "status": "open" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn channel_validation_test_and_delete() {
    let app = TestApp::new(test_config());
    let (status, _) = app
        .post("/api/notification-channels", json!({ "name": "x", "channel_type": "carrier-pigeon" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post("/api/notification-channels", json!({ "name": "x", "channel_type": "slack" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, email) = app
        .post(
            "/api/notification-channels",
            json!({ "name": "oncall", "channel_type": "email", "config": { "to": "oncall@example.com" } }),
        )
        .await;
    let id = email["id"].as_str().unwrap().to_string();

    let (status, body) = app.post(&format!("/api/notification-channels/{id}/test"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["delivery"]["status"], "simulated");

    let (status, _) = app.call(Method::DELETE, &format!("/api/notification-channels/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.post(&format!("/api/notification-channels/{id}/test"), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
