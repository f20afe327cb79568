//! Telegram Bot API notification channel.
//!
//! Sends messages via `POST /bot<token>/sendMessage`. The reply body decides
//! success, not the HTTP status.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Alert, NotificationChannel, NotifyError};

const API_BASE: &str = "https://api.telegram.org";

/// Telegram notification channel.
pub struct TelegramChannel {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(client: Client, bot_token: &str, chat_id: &str) -> Self {
        Self {
            client,
            bot_token: bot_token.trim().to_string(),
            chat_id: chat_id.trim().to_string(),
        }
    }

    fn build_payload(&self, alert: &Alert) -> Value {
        json!({
            "chat_id": self.chat_id,
            "text": alert.text,
            "parse_mode": "Markdown",
        })
    }
}

/// Interpret a `sendMessage` reply.
fn check_reply(reply: &Value) -> Result<(), NotifyError> {
    if reply.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }

    let message = match reply.get("description").and_then(Value::as_str) {
        Some(description) => description.to_string(),
        None => {
            let code = reply.get("error_code").cloned().unwrap_or(Value::Null);
            format!("API Error {}", code)
        }
    };
    Err(NotifyError::Rejected(message))
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn channel_type(&self) -> &'static str {
        "telegram"
    }

    fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        if !self.is_configured() {
            return Err(NotifyError::MissingCredentials("Telegram bot token or chat id"));
        }

        let url = format!("{}/bot{}/sendMessage", API_BASE, self.bot_token);
        let reply: Value = self
            .client
            .post(&url)
            .json(&self.build_payload(alert))
            .send()
            .await?
            .json()
            .await?;

        check_reply(&reply)
    }
}
