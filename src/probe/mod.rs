//! Probe module: the network relay, response validation and the checker that
//! ties them together.

mod checker;
mod http;
mod validator;

pub use checker::*;
pub use http::*;
pub use validator::*;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::store::{ClientIdentity, Outcome, TargetId, ValidationRule};

/// Upper bound on a single probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// What the relay saw for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    pub status: u16,
    pub body: String,
}

impl RelayResponse {
    /// Whether the HTTP status alone counts as reachable.
    pub fn is_ok(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// The external network-fetch collaborator.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Fetch `url` once, presenting the given client identity.
    async fn probe(&self, url: &str, identity: ClientIdentity) -> Result<RelayResponse, ProbeError>;
}

/// Everything a check needs, captured when the target is claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    pub id: TargetId,
    pub url: String,
    pub validation: ValidationRule,
    pub client_identity: ClientIdentity,
}

/// Normalized result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub outcome: Outcome,
    pub latency_ms: u64,
    pub detail: String,
}

impl CheckOutcome {
    pub fn up(latency_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Up,
            latency_ms,
            detail: detail.into(),
        }
    }

    pub fn down(latency_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Down,
            latency_ms,
            detail: detail.into(),
        }
    }

    pub fn is_up(&self) -> bool {
        self.outcome == Outcome::Up
    }
}

/// Trim a URL and give it the secure scheme when it has none.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() || trimmed.contains("://") {
        return trimmed.to_string();
    }
    format!("https://{}", trimmed)
}
