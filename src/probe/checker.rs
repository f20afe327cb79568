//! Checker: one probe for one target, normalized into an outcome.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{classify, normalize_url, CheckOutcome, CheckRequest, ProbeError, Relay, PROBE_TIMEOUT};

pub const DETAIL_TIMEOUT: &str = "Timeout";
pub const DETAIL_CONNECTION_FAILED: &str = "Connection Failed";

/// Performs a single check. Implementations never fail; every problem becomes
/// a DOWN outcome with an explanatory detail.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn run(&self, request: &CheckRequest) -> CheckOutcome;
}

/// Checker that goes through a [`Relay`] and validates the response.
pub struct RelayChecker {
    relay: Arc<dyn Relay>,
    timeout: Duration,
}

impl RelayChecker {
    pub fn new(relay: Arc<dyn Relay>) -> Self {
        Self::with_timeout(relay, PROBE_TIMEOUT)
    }

    pub fn with_timeout(relay: Arc<dyn Relay>, timeout: Duration) -> Self {
        Self { relay, timeout }
    }
}

#[async_trait]
impl Checker for RelayChecker {
    async fn run(&self, request: &CheckRequest) -> CheckOutcome {
        let url = normalize_url(&request.url);
        let start = Instant::now();

        let result = tokio::time::timeout(
            self.timeout,
            self.relay.probe(&url, request.client_identity),
        )
        .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Err(_) | Ok(Err(ProbeError::Timeout(_))) => {
                tracing::debug!("Check for {} timed out after {}ms", url, latency_ms);
                CheckOutcome::down(latency_ms, DETAIL_TIMEOUT)
            }
            Ok(Err(e)) => {
                tracing::debug!("Check for {} failed: {}", url, e);
                CheckOutcome::down(latency_ms, DETAIL_CONNECTION_FAILED)
            }
            Ok(Ok(response)) => {
                let verdict = classify(&request.validation, &response);
                tracing::debug!(
                    "Check for {} finished in {}ms: {}",
                    url,
                    latency_ms,
                    verdict.detail
                );
                if verdict.up {
                    CheckOutcome::up(latency_ms, verdict.detail)
                } else {
                    CheckOutcome::down(latency_ms, verdict.detail)
                }
            }
        }
    }
}
