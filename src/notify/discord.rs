//! Discord webhook notification channel.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use super::{Alert, NotificationChannel, NotifyError};

const USERNAME: &str = "Javelin";
const AVATAR_URL: &str = "https://raw.githubusercontent.com/lucide-icons/lucide/main/icons/rocket.svg";

const COLOR_UP: u32 = 5763719;
const COLOR_DOWN: u32 = 15548997;

/// Discord notification channel.
pub struct DiscordChannel {
    client: Client,
    webhook_url: String,
}

impl DiscordChannel {
    pub fn new(client: Client, webhook_url: &str) -> Self {
        Self {
            client,
            webhook_url: webhook_url.trim().to_string(),
        }
    }

    /// Get the embed title and color for an alert.
    fn style(alert: &Alert) -> (&'static str, u32) {
        if alert.is_up {
            ("System Operational", COLOR_UP)
        } else {
            ("System Critical", COLOR_DOWN)
        }
    }

    fn build_payload(alert: &Alert) -> Value {
        let (title, color) = Self::style(alert);
        json!({
            "username": USERNAME,
            "avatar_url": AVATAR_URL,
            "embeds": [{
                "title": title,
                "description": alert.text,
                "color": color,
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }],
        })
    }
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    fn channel_type(&self) -> &'static str {
        "discord"
    }

    fn is_configured(&self) -> bool {
        !self.webhook_url.is_empty()
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        if !self.is_configured() {
            return Err(NotifyError::MissingCredentials("Discord webhook URL"));
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&Self::build_payload(alert))
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 200 || status == 204 {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected(format!("HTTP {}: {}", status, body)))
    }
}
