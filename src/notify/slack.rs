//! Slack incoming-webhook channel.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Alert, NotificationChannel, NotifyError};

const COLOR_UP: &str = "#36a64f";
const COLOR_DOWN: &str = "#d90000";

pub struct SlackChannel {
    client: Client,
    webhook_url: String,
}

impl SlackChannel {
    pub fn new(client: Client, webhook_url: &str) -> Self {
        Self {
            client,
            webhook_url: webhook_url.trim().to_string(),
        }
    }

    fn build_payload(alert: &Alert) -> Value {
        let (color, summary) = if alert.is_up {
            (COLOR_UP, "Service Restored")
        } else {
            (COLOR_DOWN, "Service Outage")
        };

        json!({
            "text": alert.text,
            "attachments": [{ "color": color, "text": summary }],
        })
    }
}

/// Slack answers a literal `ok` on success.
fn check_reply(status: u16, body: &str) -> Result<(), NotifyError> {
    if !(200..300).contains(&status) {
        return Err(NotifyError::Rejected(format!("HTTP {}: {}", status, body)));
    }
    if body != "ok" {
        return Err(NotifyError::Rejected(format!("API Error: {}", body)));
    }
    Ok(())
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn channel_type(&self) -> &'static str {
        "slack"
    }

    fn is_configured(&self) -> bool {
        !self.webhook_url.is_empty()
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        if !self.is_configured() {
            return Err(NotifyError::MissingCredentials("Slack webhook URL"));
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&Self::build_payload(alert))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        check_reply(status, &body)
    }
}
