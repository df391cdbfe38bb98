//! Outbound event notifications over a maker-style webhook.

use crate::state::Notification;
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde_json::json;

/// Best-effort event delivery. Callers log failures and move on.
pub trait Notifier: Send {
    fn send(&mut self, notification: &Notification) -> Result<()>;
}

pub struct WebhookNotifier {
    client: Client,
    base_url: String,
    key: Option<String>,
}

impl WebhookNotifier {
    /// Without a key every send is skipped.
    pub fn new(base_url: String, key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            key,
        }
    }
}

pub(crate) fn webhook_url(base_url: &str, event: &str, key: &str) -> String {
    format!("{}/{event}/with/key/{key}", base_url.trim_end_matches('/'))
}

pub(crate) fn webhook_body(notification: &Notification) -> serde_json::Value {
    match notification {
        Notification::WrongCode { snapshot_url } => json!({ "value1": snapshot_url }),
        Notification::Armed | Notification::Disarmed => json!({}),
    }
}

impl Notifier for WebhookNotifier {
    fn send(&mut self, notification: &Notification) -> Result<()> {
        let Some(key) = self.key.as_deref() else {
            tracing::debug!(
                event = notification.event_name(),
                "webhook key not configured; notification skipped"
            );
            return Ok(());
        };
        let event = notification.event_name();
        let body = webhook_body(notification);
        tracing::debug!(
            url = %webhook_url(&self.base_url, event, "<redacted>"),
            %body,
            "sending webhook"
        );
        let response = self
            .client
            .post(webhook_url(&self.base_url, event, key))
            .json(&body)
            .send()
            .with_context(|| format!("webhook {event} failed"))?;
        if !response.status().is_success() {
            bail!("webhook {event} returned {}", response.status());
        }
        Ok(())
    }
}
