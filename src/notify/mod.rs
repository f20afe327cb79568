//! Notification module: outbound alerts on status transitions.
//!
//! Channels:
//! - Telegram Bot API
//! - Slack incoming webhooks
//! - Discord webhooks

mod discord;
mod slack;
mod telegram;

pub use discord::DiscordChannel;
pub use slack::SlackChannel;
pub use telegram::TelegramChannel;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::activity::ActivityLog;
use crate::store::{MonitorConfig, Transition};

/// Upper bound on one notification request.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(15);

const TEST_MESSAGE: &str = "🔔 This is a test message from Javelin. Your integration is working!";

/// Notification error types.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Missing {0}")]
    MissingCredentials(&'static str),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("{0}")]
    Rejected(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Transport(e.to_string())
    }
}

/// A message plus whether it reports good news.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub text: String,
    pub is_up: bool,
}

impl Alert {
    pub fn down(url: &str, detail: &str) -> Self {
        Self {
            text: format!("❌ [{}] is DOWN.\nError: {}", url, detail),
            is_up: false,
        }
    }

    pub fn restored(url: &str) -> Self {
        Self {
            text: format!("✅ [{}] is BACK UP!", url),
            is_up: true,
        }
    }

    pub fn test() -> Self {
        Self {
            text: TEST_MESSAGE.to_string(),
            is_up: true,
        }
    }

    pub fn for_transition(transition: Transition, url: &str, detail: &str) -> Self {
        match transition {
            Transition::WentDown => Self::down(url, detail),
            Transition::Restored => Self::restored(url),
        }
    }
}

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Whether the channel has the credentials it needs.
    fn is_configured(&self) -> bool;

    /// Send one alert. Reports failure instead of panicking or retrying.
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Shared client for channel requests.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(SEND_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}

/// Build the channel set described by a configuration.
pub fn channels_from_config(config: &MonitorConfig) -> Vec<Arc<dyn NotificationChannel>> {
    let client = http_client();
    let mut channels: Vec<Arc<dyn NotificationChannel>> = vec![Arc::new(TelegramChannel::new(
        client.clone(),
        &config.bot_token,
        &config.chat_id,
    ))];

    if let Some(url) = config.slack_webhook_url.as_deref() {
        channels.push(Arc::new(SlackChannel::new(client.clone(), url)));
    }
    if let Some(url) = config.discord_webhook_url.as_deref() {
        channels.push(Arc::new(DiscordChannel::new(client, url)));
    }

    channels
}

/// Result of one channel test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelTestResult {
    pub channel: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fans alerts out to every configured channel.
pub struct Dispatcher {
    channels: RwLock<Vec<Arc<dyn NotificationChannel>>>,
    activity: Arc<ActivityLog>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>, activity: Arc<ActivityLog>) -> Self {
        Self {
            channels: RwLock::new(channels),
            activity,
        }
    }

    pub fn from_config(config: &MonitorConfig, activity: Arc<ActivityLog>) -> Self {
        Self::new(channels_from_config(config), activity)
    }

    /// Rebuild the channel set after a configuration change.
    pub fn reconfigure(&self, config: &MonitorConfig) {
        let channels = channels_from_config(config);
        let active: Vec<&'static str> = channels
            .iter()
            .filter(|c| c.is_configured())
            .map(|c| c.channel_type())
            .collect();
        tracing::info!("Notification channels configured: {:?}", active);
        *self.channels.write() = channels;
    }

    fn configured(&self) -> Vec<Arc<dyn NotificationChannel>> {
        self.channels
            .read()
            .iter()
            .filter(|c| c.is_configured())
            .cloned()
            .collect()
    }

    /// Fire-and-forget: one task per configured channel. The handles are
    /// returned so callers that care (tests) can wait for delivery.
    pub fn on_transition(
        &self,
        url: &str,
        transition: Transition,
        detail: &str,
    ) -> Vec<JoinHandle<()>> {
        let alert = Alert::for_transition(transition, url, detail);

        self.configured()
            .into_iter()
            .map(|channel| {
                let alert = alert.clone();
                let activity = self.activity.clone();
                tokio::spawn(async move {
                    match channel.send(&alert).await {
                        Ok(()) => tracing::debug!("{} alert delivered", channel.channel_type()),
                        Err(e) => {
                            let name = channel.channel_type();
                            tracing::warn!("{} alert failed: {}", name, e);
                            activity.error(format!("{} notification failed: {}", name, e));
                        }
                    }
                })
            })
            .collect()
    }

    /// Send a test message through every configured channel and wait for all.
    pub async fn test_channels(&self) -> Vec<ChannelTestResult> {
        let alert = Alert::test();
        let handles: Vec<_> = self
            .configured()
            .into_iter()
            .map(|channel| {
                let alert = alert.clone();
                tokio::spawn(async move { (channel.channel_type(), channel.send(&alert).await) })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((channel, Ok(()))) => {
                    self.activity.success(format!("{} test notification sent", channel));
                    results.push(ChannelTestResult { channel, success: true, error: None });
                }
                Ok((channel, Err(e))) => {
                    self.activity.error(format!("{} test notification failed: {}", channel, e));
                    results.push(ChannelTestResult {
                        channel,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
                Err(e) => tracing::error!("Notification test task failed: {}", e),
            }
        }
        results
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::mpsc;

    /// Channel that forwards alerts into an mpsc queue.
    pub struct RecordingChannel {
        pub name: &'static str,
        pub fail: bool,
        pub tx: mpsc::UnboundedSender<(&'static str, Alert)>,
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        fn channel_type(&self) -> &'static str {
            self.name
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
            let _ = self.tx.send((self.name, alert.clone()));
            if self.fail {
                Err(NotifyError::Rejected("HTTP 500: boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    pub type Sent = mpsc::UnboundedReceiver<(&'static str, Alert)>;

    pub fn recording(names: &[(&'static str, bool)]) -> (Vec<Arc<dyn NotificationChannel>>, Sent) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channels = names
            .iter()
            .map(|&(name, fail)| {
                let channel = RecordingChannel { name, fail, tx: tx.clone() };
                Arc::new(channel) as Arc<dyn NotificationChannel>
            })
            .collect();
        (channels, rx)
    }

    /// Channel that records the alert and then never answers.
    pub struct HangingChannel {
        pub tx: mpsc::UnboundedSender<(&'static str, Alert)>,
    }

    #[async_trait]
    impl NotificationChannel for HangingChannel {
        fn channel_type(&self) -> &'static str {
            "stuck"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
            let _ = self.tx.send(("stuck", alert.clone()));
            std::future::pending().await
        }
    }

    pub fn hanging() -> (Arc<dyn NotificationChannel>, Sent) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(HangingChannel { tx }), rx)
    }
}
