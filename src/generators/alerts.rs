use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{pick, round2, SERVICES};
use crate::models::{Alert, AlertStatus, Incident, IncidentEvent, IncidentStatus, Severity};

struct AlertTemplate {
    name: &'static str,
    severity: Severity,
    threshold: f64,
    min: f64,
    max: f64,
    summary: &'static str,
}

const TEMPLATES: &[AlertTemplate] = &[
    AlertTemplate { name: "HighErrorRate", severity: Severity::Critical, threshold: 5.0, min: 5.5, max: 40.0, summary: "Error rate above 5%" },
    AlertTemplate { name: "HighLatencyP99", severity: Severity::Warning, threshold: 500.0, min: 510.0, max: 4000.0, summary: "p99 latency above 500ms" },
    AlertTemplate { name: "HighCpuUsage", severity: Severity::Warning, threshold: 80.0, min: 81.0, max: 100.0, summary: "CPU usage above 80%" },
    AlertTemplate { name: "HighMemoryUsage", severity: Severity::Warning, threshold: 90.0, min: 90.5, max: 99.9, summary: "Memory usage above 90%" },
    AlertTemplate { name: "QueueBacklog", severity: Severity::Info, threshold: 1000.0, min: 1001.0, max: 25000.0, summary: "Queue depth above 1000 messages" },
    AlertTemplate { name: "ServiceDown", severity: Severity::Critical, threshold: 1.0, min: 0.0, max: 0.0, summary: "Service is not answering health checks" },
];

const INCIDENT_TITLES: &[&str] = &[
    "Checkout failures in eu-west",
    "Elevated API latency",
    "Payment provider degradation",
    "Search index lagging",
    "Login errors after deploy",
];

const ASSIGNEES: &[&str] = &["oncall-primary", "oncall-secondary", "sre-team", "platform-team"];

/// Stable FNV-1a fingerprint over the alert name and sorted labels.
pub fn fingerprint(name: &str, labels: &BTreeMap<String, String>) -> String {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    let mut feed = |bytes: &[u8]| {
        for b in bytes {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(PRIME);
        }
    };
    feed(name.as_bytes());
    for (k, v) in labels {
        feed(&[0xff]);
        feed(k.as_bytes());
        feed(&[0xfe]);
        feed(v.as_bytes());
    }
    format!("{hash:016x}")
}

pub fn generate_alert<R: Rng + ?Sized>(rng: &mut R) -> Alert {
    let template = pick(rng, TEMPLATES);
    let service = pick(rng, SERVICES);
    let value = if template.max > template.min {
        round2(rng.random_range(template.min..=template.max))
    } else {
        template.min
    };

    let mut labels = BTreeMap::new();
    labels.insert("alertname".to_string(), template.name.to_string());
    labels.insert("service".to_string(), service.to_string());
    labels.insert("severity".to_string(), template.severity.as_str().to_string());

    // Most synthetic alerts are still firing; a few resolved ones give history.
    let started_at = Utc::now() - ChronoDuration::seconds(rng.random_range(30..7200));
    let (status, resolved_at) = if rng.random_bool(0.2) {
        let resolved = started_at + ChronoDuration::seconds(rng.random_range(10..1800));
        (AlertStatus::Resolved, Some(resolved.min(Utc::now())))
    } else {
        (AlertStatus::Firing, None)
    };

    Alert {
        id: Uuid::new_v4().to_string(),
        rule_id: None,
        name: template.name.to_string(),
        status,
        severity: template.severity,
        value,
        threshold: template.threshold,
        message: format!("{} on {service} (value {value})", template.summary),
        fingerprint: fingerprint(template.name, &labels),
        labels,
        started_at,
        resolved_at,
    }
}

pub fn generate_alerts<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Alert> {
    (0..count).map(|_| generate_alert(rng)).collect()
}

pub fn generate_incident<R: Rng + ?Sized>(rng: &mut R) -> Incident {
    let alert_count = rng.random_range(1..=4);
    let alerts = generate_alerts(rng, alert_count);
    let severity = if alerts.iter().any(|a| a.severity == Severity::Critical) {
        Severity::Critical
    } else {
        Severity::Warning
    };
    let created_at = alerts
        .iter()
        .map(|a| a.started_at)
        .min()
        .unwrap_or_else(Utc::now);

    let status = match rng.random_range(0..3) {
        0 => IncidentStatus::Open,
        1 => IncidentStatus::Investigating,
        _ => IncidentStatus::Resolved,
    };

    let mut timeline = vec![IncidentEvent {
        at: created_at,
        message: format!("Incident opened from {} alert(s)", alerts.len()),
    }];
    let mut updated_at = created_at;
    if status != IncidentStatus::Open {
        updated_at = created_at + ChronoDuration::minutes(rng.random_range(1..30));
        timeline.push(IncidentEvent {
            at: updated_at,
            message: "Status changed to investigating".to_string(),
        });
    }
    let resolved_at = if status == IncidentStatus::Resolved {
        updated_at += ChronoDuration::minutes(rng.random_range(5..120));
        timeline.push(IncidentEvent {
            at: updated_at,
            message: "Status changed to resolved".to_string(),
        });
        Some(updated_at)
    } else {
        None
    };

    Incident {
        id: Uuid::new_v4().to_string(),
        title: pick(rng, INCIDENT_TITLES).to_string(),
        description: alerts.iter().map(|a| a.message.as_str()).collect::<Vec<_>>().join("; "),
        status,
        severity,
        alert_ids: alerts.into_iter().map(|a| a.id).collect(),
        assignee: Some(pick(rng, ASSIGNEES).to_string()),
        timeline,
        created_at,
        updated_at,
        resolved_at,
    }
}

pub fn generate_incidents<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Incident> {
    (0..count).map(|_| generate_incident(rng)).collect()
}
