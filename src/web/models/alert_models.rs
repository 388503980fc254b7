use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{IncidentStatus, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAlertRuleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub metric: String,
    /// Free-form PromQL kept for display; defaults to the metric name.
    pub query: Option<String>,
    pub comparison_operator: String,
    pub threshold: f64,
    #[serde(default)]
    pub duration_seconds: u32,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub enabled: Option<bool>,
    #[serde(default)]
    pub notification_channel_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAlertRuleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub metric: Option<String>,
    pub query: Option<String>,
    pub comparison_operator: Option<String>,
    pub threshold: Option<f64>,
    pub duration_seconds: Option<u32>,
    pub severity: Option<Severity>,
    pub labels: Option<BTreeMap<String, String>>,
    pub annotations: Option<BTreeMap<String, String>>,
    pub enabled: Option<bool>,
    pub notification_channel_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIncidentRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub alert_ids: Vec<String>,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateIncidentStatusRequest {
    pub status: IncidentStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotificationChannelRequest {
    pub name: String,
    pub channel_type: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    pub enabled: Option<bool>,
}
