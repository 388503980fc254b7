//! Request bodies for Loki, Tempo (OTLP/HTTP JSON) and Alertmanager.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::generators::logs::format_line;
use crate::models::{APMData, Alert, AlertStatus, LogEntry, Trace};

fn unix_nanos(at: DateTime<Utc>) -> String {
    at.timestamp_nanos_opt()
        .unwrap_or_else(|| at.timestamp_micros().saturating_mul(1000))
        .to_string()
}

/// Loki push body: one stream per (service, level), values as `[ns, line]`.
pub fn loki_push_body(entries: &[LogEntry], source: &str) -> Value {
    let mut streams: BTreeMap<(&str, &str), Vec<Value>> = BTreeMap::new();
    for entry in entries {
        streams
            .entry((entry.service.as_str(), entry.level.as_str()))
            .or_default()
            .push(json!([unix_nanos(entry.timestamp), format_line(entry)]));
    }

    let streams: Vec<Value> = streams
        .into_iter()
        .map(|((service, level), values)| {
            json!({
                "stream": { "service": service, "level": level, "source": source },
                "values": values,
            })
        })
        .collect();
    json!({ "streams": streams })
}

fn otlp_string(key: &str, value: &str) -> Value {
    json!({ "key": key, "value": { "stringValue": value } })
}

fn otlp_span(span: &APMData) -> Value {
    let mut attributes: Vec<Value> = span.tags.iter().map(|(k, v)| otlp_string(k, v)).collect();
    attributes.push(json!({
        "key": "http.status_code",
        "value": { "intValue": span.status_code.to_string() }
    }));

    let mut body = json!({
        "traceId": span.trace_id,
        "spanId": span.span_id,
        "name": span.operation,
        "kind": span.kind.otlp_code(),
        "startTimeUnixNano": unix_nanos(span.timestamp),
        "endTimeUnixNano": unix_nanos(span.end_time()),
        "attributes": attributes,
        // OTLP status: 1 = OK, 2 = ERROR
        "status": { "code": if span.error { 2 } else { 1 } },
    });
    if let Some(parent) = &span.parent_span_id {
        body["parentSpanId"] = json!(parent);
    }
    body
}

/// OTLP/HTTP JSON `ExportTraceServiceRequest`, spans grouped by service.
pub fn otlp_traces_body(traces: &[Trace], source: &str) -> Value {
    let mut by_service: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    for span in traces.iter().flat_map(|t| t.spans.iter()) {
        by_service
            .entry(span.service_name.as_str())
            .or_default()
            .push(otlp_span(span));
    }

    let resource_spans: Vec<Value> = by_service
        .into_iter()
        .map(|(service, spans)| {
            json!({
                "resource": { "attributes": [otlp_string("service.name", service)] },
                "scopeSpans": [{ "scope": { "name": source }, "spans": spans }],
            })
        })
        .collect();
    json!({ "resourceSpans": resource_spans })
}

/// Alertmanager v2 `postableAlerts` array.
pub fn alertmanager_body(alerts: &[Alert], generator_url: &str) -> Value {
    let alerts: Vec<Value> = alerts
        .iter()
        .map(|alert| {
            let mut labels = alert.labels.clone();
            labels
                .entry("alertname".to_string())
                .or_insert_with(|| alert.name.clone());
            labels
                .entry("severity".to_string())
                .or_insert_with(|| alert.severity.as_str().to_string());

            let mut body = json!({
                "labels": labels,
                "annotations": {
                    "summary": alert.message,
                    "value": alert.value.to_string(),
                    "threshold": alert.threshold.to_string(),
                },
                "startsAt": alert.started_at.to_rfc3339(),
                "generatorURL": generator_url,
            });
            if alert.status == AlertStatus::Resolved {
                let ends_at = alert.resolved_at.unwrap_or_else(Utc::now);
                body["endsAt"] = json!(ends_at.to_rfc3339());
            }
            body
        })
        .collect();
    Value::Array(alerts)
}
