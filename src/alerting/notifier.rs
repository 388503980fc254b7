use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::store::format_labels;
use crate::models::{Alert, AlertRule, NotificationChannel};
use crate::telemetry::{MetricsRegistry, NOTIFICATIONS_TOTAL};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Channel has no config.url")]
    MissingUrl,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Receiver answered with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// What gets delivered, independent of the channel.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub title: String,
    pub text: String,
    pub severity: String,
    pub alert: Option<Alert>,
}

impl NotificationMessage {
    pub fn for_alert(rule: &AlertRule, alert: &Alert) -> Self {
        Self {
            title: format!("[{}] {}", alert.severity.as_str().to_uppercase(), rule.name),
            text: format!("{} ({})", alert.message, format_labels(&alert.labels)),
            severity: alert.severity.as_str().to_string(),
            alert: Some(alert.clone()),
        }
    }

    pub fn test_message(channel: &NotificationChannel) -> Self {
        Self {
            title: "Argus test notification".to_string(),
            text: format!("Test message for channel '{}'", channel.name),
            severity: "info".to_string(),
            alert: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Simulated,
    Skipped,
    Failed,
}

impl DeliveryStatus {
    fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Simulated => "simulated",
            DeliveryStatus::Skipped => "skipped",
            DeliveryStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRecord {
    pub channel_id: String,
    pub channel_type: String,
    pub status: DeliveryStatus,
    pub detail: String,
}

impl DeliveryRecord {
    pub fn is_failure(&self) -> bool {
        self.status == DeliveryStatus::Failed
    }
}

/// Delivers a message to one kind of HTTP receiver.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        channel: &NotificationChannel,
        message: &NotificationMessage,
    ) -> Result<(), NotificationError>;
}

async fn post_json(client: &Client, url: &str, body: &Value) -> Result<(), NotificationError> {
    let response = client
        .post(url)
        .timeout(SEND_TIMEOUT)
        .header(header::CONTENT_TYPE, "application/json")
        .json(body)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        return Err(NotificationError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

fn channel_url(channel: &NotificationChannel) -> Result<&str, NotificationError> {
    channel
        .config
        .get("url")
        .map(String::as_str)
        .filter(|u| !u.is_empty())
        .ok_or(NotificationError::MissingUrl)
}

/// POSTs the whole message as JSON.
pub struct WebhookSender {
    client: Client,
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(
        &self,
        channel: &NotificationChannel,
        message: &NotificationMessage,
    ) -> Result<(), NotificationError> {
        let url = channel_url(channel)?;
        let body = json!({
            "title": message.title,
            "text": message.text,
            "severity": message.severity,
            "alert": message.alert,
            "channel": channel.name,
        });
        post_json(&self.client, url, &body).await
    }
}

/// Slack incoming-webhook payload.
pub struct SlackSender {
    client: Client,
}

#[async_trait]
impl NotificationSender for SlackSender {
    async fn send(
        &self,
        channel: &NotificationChannel,
        message: &NotificationMessage,
    ) -> Result<(), NotificationError> {
        let url = channel_url(channel)?;
        let mut body = json!({ "text": format!("*{}*\n{}", message.title, message.text) });
        if let Some(target) = channel.config.get("channel") {
            body["channel"] = json!(target);
        }
        post_json(&self.client, url, &body).await
    }
}

pub struct NotificationDispatcher {
    webhook: WebhookSender,
    slack: SlackSender,
    registry: Arc<MetricsRegistry>,
}

impl NotificationDispatcher {
    pub fn new(client: Client, registry: Arc<MetricsRegistry>) -> Self {
        Self {
            webhook: WebhookSender { client: client.clone() },
            slack: SlackSender { client },
            registry,
        }
    }

    fn sender_for(&self, channel_type: &str) -> Option<&dyn NotificationSender> {
        match channel_type {
            "webhook" => Some(&self.webhook as &dyn NotificationSender),
            "slack" => Some(&self.slack as &dyn NotificationSender),
            _ => None,
        }
    }

    /// Sends to one channel. Email and PagerDuty deliveries are only recorded.
    pub async fn deliver(&self, channel: &NotificationChannel, message: &NotificationMessage) -> DeliveryRecord {
        let (status, detail) = if !channel.enabled {
            (DeliveryStatus::Skipped, "channel is disabled".to_string())
        } else {
            match self.sender_for(&channel.channel_type) {
                Some(sender) => match sender.send(channel, message).await {
                    Ok(()) => (DeliveryStatus::Sent, "delivered".to_string()),
                    Err(e) => {
                        warn!(channel_id = %channel.id, channel_type = %channel.channel_type, error = %e, "Notification delivery failed.");
                        (DeliveryStatus::Failed, e.to_string())
                    }
                },
                None => {
                    info!(channel_id = %channel.id, channel_type = %channel.channel_type, title = %message.title, "Simulated notification.");
                    (
                        DeliveryStatus::Simulated,
                        format!("{} delivery simulated", channel.channel_type),
                    )
                }
            }
        };

        self.registry.inc_counter(
            NOTIFICATIONS_TOTAL,
            &[("channel_type", channel.channel_type.as_str()), ("status", status.as_str())],
            1.0,
        );
        DeliveryRecord {
            channel_id: channel.id.clone(),
            channel_type: channel.channel_type.clone(),
            status,
            detail,
        }
    }

    pub async fn notify_alert(
        &self,
        channels: &[NotificationChannel],
        rule: &AlertRule,
        alert: &Alert,
    ) -> Vec<DeliveryRecord> {
        let message = NotificationMessage::for_alert(rule, alert);
        let mut records = Vec::with_capacity(channels.len());
        for channel in channels {
            records.push(self.deliver(channel, &message).await);
        }
        records
    }
}
