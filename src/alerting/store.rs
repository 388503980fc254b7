use chrono::{DateTime, Utc};
use reqwest::Url;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::evaluation::Comparison;
use super::CHANNEL_TYPES;
use crate::generators::alerts::fingerprint;
use crate::models::{
    Alert, AlertRule, AlertStatus, Incident, IncidentEvent, IncidentStatus, NotificationChannel,
};
use crate::web::models::alert_models::{
    CreateAlertRuleRequest, CreateIncidentRequest, CreateNotificationChannelRequest,
    UpdateAlertRuleRequest, UpdateIncidentStatusRequest,
};

#[derive(Error, Debug, PartialEq)]
pub enum AlertStoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{0}")]
    Invalid(String),
}

fn not_found(kind: &'static str, id: &str) -> AlertStoreError {
    AlertStoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

/// Resolved alerts kept for history; older ones are dropped as new alerts fire.
pub const MAX_RESOLVED_ALERTS: usize = 500;

#[derive(Debug, Default)]
struct AlertState {
    rules: Vec<AlertRule>,
    alerts: Vec<Alert>,
    incidents: Vec<Incident>,
    channels: Vec<NotificationChannel>,
}

impl AlertState {
    fn check_channels_exist(&self, ids: &[String]) -> Result<(), AlertStoreError> {
        match ids.iter().find(|id| !self.channels.iter().any(|c| &c.id == *id)) {
            Some(missing) => Err(AlertStoreError::Invalid(format!(
                "notification channel '{missing}' does not exist"
            ))),
            None => Ok(()),
        }
    }

    /// The unresolved alert raised by `rule_id`, if any.
    fn active_alert_mut(&mut self, rule_id: &str) -> Option<&mut Alert> {
        self.alerts
            .iter_mut()
            .find(|a| a.rule_id.as_deref() == Some(rule_id) && a.status != AlertStatus::Resolved)
    }

    /// Resolves the open alert of `rule_id`. Returns whether there was one.
    fn resolve_rule_alert(&mut self, rule_id: &str, at: DateTime<Utc>) -> bool {
        match self.active_alert_mut(rule_id) {
            Some(alert) => {
                alert.status = AlertStatus::Resolved;
                alert.resolved_at = Some(at);
                true
            }
            None => false,
        }
    }

    fn push_alert(&mut self, alert: Alert) {
        self.alerts.push(alert);
        let resolved = self
            .alerts
            .iter()
            .filter(|a| a.status == AlertStatus::Resolved)
            .count();
        if resolved > MAX_RESOLVED_ALERTS {
            // oldest first, alerts are appended in firing order
            let mut excess = resolved - MAX_RESOLVED_ALERTS;
            self.alerts.retain(|a| {
                if excess > 0 && a.status == AlertStatus::Resolved {
                    excess -= 1;
                    false
                } else {
                    true
                }
            });
        }
    }
}

/// What a single rule evaluation did to the alert list.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleTransition {
    Fired(Alert),
    StillFiring,
    Resolved,
    Unchanged,
}

fn validate_rule_fields(name: &str, metric: &str, operator: &str, threshold: f64) -> Result<(), AlertStoreError> {
    if name.trim().is_empty() {
        return Err(AlertStoreError::Invalid("name must not be empty".to_string()));
    }
    if metric.trim().is_empty() {
        return Err(AlertStoreError::Invalid("metric must not be empty".to_string()));
    }
    if Comparison::parse(operator).is_none() {
        return Err(AlertStoreError::Invalid(format!(
            "unsupported comparison_operator '{operator}', expected one of >, >=, <, <=, ==, !="
        )));
    }
    if !threshold.is_finite() {
        return Err(AlertStoreError::Invalid("threshold must be a finite number".to_string()));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct AlertStore {
    state: RwLock<AlertState>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Rules ---

    pub async fn create_rule(&self, payload: CreateAlertRuleRequest) -> Result<AlertRule, AlertStoreError> {
        validate_rule_fields(&payload.name, &payload.metric, &payload.comparison_operator, payload.threshold)?;
        let mut state = self.state.write().await;
        state.check_channels_exist(&payload.notification_channel_ids)?;

        let now = Utc::now();
        let rule = AlertRule {
            id: Uuid::new_v4().to_string(),
            name: payload.name.trim().to_string(),
            description: payload.description,
            query: payload.query.unwrap_or_else(|| payload.metric.clone()),
            metric: payload.metric.trim().to_string(),
            comparison_operator: payload.comparison_operator.trim().to_string(),
            threshold: payload.threshold,
            duration_seconds: payload.duration_seconds,
            severity: payload.severity,
            labels: payload.labels,
            annotations: payload.annotations,
            enabled: payload.enabled.unwrap_or(true),
            notification_channel_ids: payload.notification_channel_ids,
            created_at: now,
            updated_at: now,
            last_evaluated_at: None,
            last_triggered_at: None,
        };
        state.rules.push(rule.clone());
        Ok(rule)
    }

    pub async fn list_rules(&self) -> Vec<AlertRule> {
        self.state.read().await.rules.clone()
    }

    pub async fn get_rule(&self, id: &str) -> Result<AlertRule, AlertStoreError> {
        let state = self.state.read().await;
        state
            .rules
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found("alert rule", id))
    }

    pub async fn update_rule(
        &self,
        id: &str,
        payload: UpdateAlertRuleRequest,
    ) -> Result<AlertRule, AlertStoreError> {
        let mut state = self.state.write().await;
        if let Some(ids) = &payload.notification_channel_ids {
            state.check_channels_exist(ids)?;
        }
        let rule = state
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("alert rule", id))?;

        let was_enabled = rule.enabled;
        let mut updated = rule.clone();
        if let Some(name) = payload.name {
            updated.name = name.trim().to_string();
        }
        if let Some(description) = payload.description {
            updated.description = description;
        }
        if let Some(metric) = payload.metric {
            updated.metric = metric.trim().to_string();
        }
        if let Some(query) = payload.query {
            updated.query = query;
        }
        if let Some(op) = payload.comparison_operator {
            updated.comparison_operator = op.trim().to_string();
        }
        if let Some(threshold) = payload.threshold {
            updated.threshold = threshold;
        }
        if let Some(duration) = payload.duration_seconds {
            updated.duration_seconds = duration;
        }
        if let Some(severity) = payload.severity {
            updated.severity = severity;
        }
        if let Some(labels) = payload.labels {
            updated.labels = labels;
        }
        if let Some(annotations) = payload.annotations {
            updated.annotations = annotations;
        }
        if let Some(enabled) = payload.enabled {
            updated.enabled = enabled;
        }
        if let Some(ids) = payload.notification_channel_ids {
            updated.notification_channel_ids = ids;
        }
        validate_rule_fields(&updated.name, &updated.metric, &updated.comparison_operator, updated.threshold)?;

        updated.updated_at = Utc::now();
        *rule = updated.clone();
        // evaluation skips disabled rules
        if was_enabled && !updated.enabled {
            state.resolve_rule_alert(id, updated.updated_at);
        }
        Ok(updated)
    }

    /// Deletes the rule and resolves any alert it still has open.
    pub async fn delete_rule(&self, id: &str) -> Result<(), AlertStoreError> {
        let mut state = self.state.write().await;
        let before = state.rules.len();
        state.rules.retain(|r| r.id != id);
        if state.rules.len() == before {
            return Err(not_found("alert rule", id));
        }
        state.resolve_rule_alert(id, Utc::now());
        Ok(())
    }

    pub async fn enabled_rules(&self) -> Vec<AlertRule> {
        let state = self.state.read().await;
        state.rules.iter().filter(|r| r.enabled).cloned().collect()
    }

    /// Applies one evaluation result for `rule`.
    ///
    /// `condition` is `None` when the metric has no data; the open alert, if
    /// any, is left as it is.
    pub async fn record_evaluation(
        &self,
        rule: &AlertRule,
        value: Option<f64>,
        condition: Option<bool>,
        at: DateTime<Utc>,
    ) -> RuleTransition {
        let mut state = self.state.write().await;
        let triggered = condition == Some(true);
        if let Some(stored) = state.rules.iter_mut().find(|r| r.id == rule.id) {
            stored.last_evaluated_at = Some(at);
            if triggered {
                stored.last_triggered_at = Some(at);
            }
        }

        match (condition, value) {
            (Some(true), Some(value)) => {
                if let Some(alert) = state.active_alert_mut(&rule.id) {
                    alert.value = value;
                    return RuleTransition::StillFiring;
                }
                let mut labels = rule.labels.clone();
                labels.insert("alertname".to_string(), rule.name.clone());
                labels.insert("severity".to_string(), rule.severity.as_str().to_string());
                labels.insert("metric".to_string(), rule.metric.clone());
                let alert = Alert {
                    id: Uuid::new_v4().to_string(),
                    rule_id: Some(rule.id.clone()),
                    name: rule.name.clone(),
                    status: AlertStatus::Firing,
                    severity: rule.severity,
                    value,
                    threshold: rule.threshold,
                    message: format!(
                        "{} {} {} (current value {value})",
                        rule.metric, rule.comparison_operator, rule.threshold
                    ),
                    fingerprint: fingerprint(&rule.name, &labels),
                    labels,
                    started_at: at,
                    resolved_at: None,
                };
                state.push_alert(alert.clone());
                RuleTransition::Fired(alert)
            }
            (Some(false), _) if state.resolve_rule_alert(&rule.id, at) => RuleTransition::Resolved,
            _ => RuleTransition::Unchanged,
        }
    }

    // --- Alerts ---

    pub async fn list_alerts(&self, status: Option<AlertStatus>) -> Vec<Alert> {
        let state = self.state.read().await;
        let mut alerts: Vec<Alert> = state
            .alerts
            .iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        alerts
    }

    pub async fn firing_count(&self) -> usize {
        let state = self.state.read().await;
        state
            .alerts
            .iter()
            .filter(|a| a.status == AlertStatus::Firing)
            .count()
    }

    pub async fn acknowledge_alert(&self, id: &str) -> Result<Alert, AlertStoreError> {
        let mut state = self.state.write().await;
        let alert = state
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found("alert", id))?;
        if alert.status == AlertStatus::Resolved {
            return Err(AlertStoreError::Invalid(format!("alert '{id}' is already resolved")));
        }
        alert.status = AlertStatus::Acknowledged;
        Ok(alert.clone())
    }

    /// Resolving twice is a no-op that keeps the first `resolved_at`.
    pub async fn resolve_alert(&self, id: &str) -> Result<Alert, AlertStoreError> {
        let mut state = self.state.write().await;
        let alert = state
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found("alert", id))?;
        if alert.status != AlertStatus::Resolved {
            alert.status = AlertStatus::Resolved;
            alert.resolved_at = Some(Utc::now());
        }
        Ok(alert.clone())
    }

    // --- Incidents ---

    pub async fn list_incidents(&self) -> Vec<Incident> {
        self.state.read().await.incidents.clone()
    }

    pub async fn create_incident(&self, payload: CreateIncidentRequest) -> Result<Incident, AlertStoreError> {
        if payload.title.trim().is_empty() {
            return Err(AlertStoreError::Invalid("title must not be empty".to_string()));
        }
        let mut state = self.state.write().await;
        if let Some(missing) = payload
            .alert_ids
            .iter()
            .find(|id| !state.alerts.iter().any(|a| &a.id == *id))
        {
            return Err(AlertStoreError::Invalid(format!("alert '{missing}' does not exist")));
        }

        let now = Utc::now();
        let incident = Incident {
            id: Uuid::new_v4().to_string(),
            title: payload.title.trim().to_string(),
            description: payload.description,
            status: IncidentStatus::Open,
            severity: payload.severity,
            timeline: vec![IncidentEvent {
                at: now,
                message: format!("Incident opened with {} linked alert(s)", payload.alert_ids.len()),
            }],
            alert_ids: payload.alert_ids,
            assignee: payload.assignee.filter(|a| !a.trim().is_empty()),
            created_at: now,
            updated_at: now,
            resolved_at: None,
        };
        state.incidents.push(incident.clone());
        Ok(incident)
    }

    /// Every call appends a timeline event, even when the status is unchanged.
    pub async fn update_incident_status(
        &self,
        id: &str,
        payload: UpdateIncidentStatusRequest,
    ) -> Result<Incident, AlertStoreError> {
        let mut state = self.state.write().await;
        let incident = state
            .incidents
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("incident", id))?;

        let now = Utc::now();
        let mut message = format!(
            "Status changed from {} to {}",
            incident_status_str(incident.status),
            incident_status_str(payload.status)
        );
        if let Some(note) = payload.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            message.push_str(": ");
            message.push_str(note);
        }
        incident.timeline.push(IncidentEvent { at: now, message });
        incident.status = payload.status;
        incident.updated_at = now;
        incident.resolved_at = match payload.status {
            IncidentStatus::Resolved => incident.resolved_at.or(Some(now)),
            _ => None,
        };
        Ok(incident.clone())
    }

    // --- Notification channels ---

    pub async fn list_channels(&self) -> Vec<NotificationChannel> {
        self.state.read().await.channels.clone()
    }

    pub async fn get_channel(&self, id: &str) -> Result<NotificationChannel, AlertStoreError> {
        let state = self.state.read().await;
        state
            .channels
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| not_found("notification channel", id))
    }

    /// Enabled channels among `ids`, in the order given.
    pub async fn channels_by_ids(&self, ids: &[String]) -> Vec<NotificationChannel> {
        let state = self.state.read().await;
        ids.iter()
            .filter_map(|id| state.channels.iter().find(|c| &c.id == id && c.enabled))
            .cloned()
            .collect()
    }

    pub async fn create_channel(
        &self,
        payload: CreateNotificationChannelRequest,
    ) -> Result<NotificationChannel, AlertStoreError> {
        let channel_type = payload.channel_type.trim().to_ascii_lowercase();
        if !CHANNEL_TYPES.contains(&channel_type.as_str()) {
            return Err(AlertStoreError::Invalid(format!(
                "unsupported channel_type '{}', expected one of {}",
                payload.channel_type,
                CHANNEL_TYPES.join(", ")
            )));
        }
        if payload.name.trim().is_empty() {
            return Err(AlertStoreError::Invalid("name must not be empty".to_string()));
        }
        if matches!(channel_type.as_str(), "webhook" | "slack") {
            let url = payload.config.get("url").map(String::as_str).unwrap_or_default();
            let valid = Url::parse(url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                return Err(AlertStoreError::Invalid(format!(
                    "{channel_type} channels need an http(s) config.url"
                )));
            }
        }

        let channel = NotificationChannel {
            id: Uuid::new_v4().to_string(),
            name: payload.name.trim().to_string(),
            channel_type,
            config: payload.config,
            enabled: payload.enabled.unwrap_or(true),
            created_at: Utc::now(),
        };
        self.state.write().await.channels.push(channel.clone());
        Ok(channel)
    }

    /// Also unlinks the channel from every rule.
    pub async fn delete_channel(&self, id: &str) -> Result<(), AlertStoreError> {
        let mut state = self.state.write().await;
        let before = state.channels.len();
        state.channels.retain(|c| c.id != id);
        if state.channels.len() == before {
            return Err(not_found("notification channel", id));
        }
        for rule in state.rules.iter_mut() {
            rule.notification_channel_ids.retain(|c| c != id);
        }
        Ok(())
    }
}

fn incident_status_str(status: IncidentStatus) -> &'static str {
    match status {
        IncidentStatus::Open => "open",
        IncidentStatus::Investigating => "investigating",
        IncidentStatus::Resolved => "resolved",
    }
}

/// Labels rendered as `k=v` pairs, for notification text.
pub fn format_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}
