//! HTTP request handlers.

use super::AppState;
use crate::probe::{normalize_url, ProbeError};
use crate::store::{
    document, ClientIdentity, MonitorConfig, PollingPolicy, Status, Target, TargetId, TargetSpec,
    TargetUpdate, ValidationRule,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ============================================================================
// API: Targets
// ============================================================================

/// A target plus its derived statistics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetView {
    #[serde(flatten)]
    pub target: Target,
    pub uptime_percent: f64,
    pub average_latency_ms: u64,
}

impl From<Target> for TargetView {
    fn from(target: Target) -> Self {
        Self {
            uptime_percent: target.uptime_percent(),
            average_latency_ms: target.average_latency_ms(),
            target,
        }
    }
}

/// Policy fields shared by create, batch and update requests.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyFields {
    #[serde(default)]
    pub validation_config: Option<ValidationRule>,
    #[serde(default)]
    pub interval_seconds: Option<u64>,
    #[serde(default)]
    pub use_random_interval: Option<bool>,
    #[serde(default)]
    pub user_agent_type: Option<ClientIdentity>,
}

impl PolicyFields {
    /// Polling policy for a new target; unset fields come from the global defaults.
    fn polling_or_default(&self, config: &MonitorConfig) -> PollingPolicy {
        match (self.use_random_interval, self.interval_seconds) {
            (Some(true), secs) => {
                PollingPolicy::jitter(secs.unwrap_or(config.default_interval_seconds))
            }
            (_, Some(secs)) => PollingPolicy::fixed(secs),
            (Some(false), None) => PollingPolicy::fixed(config.default_interval_seconds),
            (None, None) => config.default_polling(),
        }
    }

    /// Polling change for an existing target, if any was requested.
    ///
    /// An interval given alone keeps the current mode. Switching jitter off
    /// without an interval restores the one the target had before.
    fn polling_change(&self, current: PollingPolicy) -> Option<PollingPolicy> {
        let secs = self.interval_seconds.unwrap_or(current.interval_secs());
        match (self.use_random_interval, self.interval_seconds) {
            (Some(true), _) => Some(PollingPolicy::jitter(secs)),
            (Some(false), _) => Some(PollingPolicy::fixed(secs)),
            (None, Some(_)) if current.is_jitter() => Some(PollingPolicy::jitter(secs)),
            (None, Some(_)) => Some(PollingPolicy::fixed(secs)),
            (None, None) => None,
        }
    }

    fn spec(&self, url: &str, config: &MonitorConfig) -> TargetSpec {
        TargetSpec::new(url)
            .with_validation(self.validation_config.clone().unwrap_or_default())
            .with_polling(self.polling_or_default(config))
            .with_identity(self.user_agent_type.unwrap_or_default())
    }
}

pub async fn handle_get_targets(State(state): State<AppState>) -> impl IntoResponse {
    let targets: Vec<TargetView> = state.store.list().into_iter().map(TargetView::from).collect();
    Json(targets)
}

pub async fn handle_get_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get(&TargetId::from(id)) {
        Some(target) => Json(TargetView::from(target)).into_response(),
        None => (StatusCode::NOT_FOUND, "Target not found").into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTargetRequest {
    pub url: String,
    #[serde(flatten)]
    pub policy: PolicyFields,
}

pub async fn handle_create_target(
    State(state): State<AppState>,
    Json(req): Json<CreateTargetRequest>,
) -> impl IntoResponse {
    if req.url.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "URL is required").into_response();
    }

    let spec = req.policy.spec(&req.url, &state.store.config());
    let id = state.store.add(spec);

    match state.store.get(&id) {
        Some(target) => (StatusCode::CREATED, Json(TargetView::from(target))).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "Target vanished after insert").into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub urls: Vec<String>,
    #[serde(flatten)]
    pub policy: PolicyFields,
}

pub async fn handle_create_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchCreateRequest>,
) -> impl IntoResponse {
    let config = state.store.config();
    let specs: Vec<TargetSpec> = req
        .urls
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(|url| req.policy.spec(url, &config))
        .collect();

    if specs.is_empty() {
        return (StatusCode::BAD_REQUEST, "No URLs provided").into_response();
    }

    let ids = state.store.add_batch(specs);
    (StatusCode::CREATED, Json(json!({ "ids": ids }))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct UpdateTargetRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub policy: PolicyFields,
}

pub async fn handle_update_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTargetRequest>,
) -> impl IntoResponse {
    let id = TargetId::from(id);
    let Some(existing) = state.store.get(&id) else {
        return (StatusCode::NOT_FOUND, "Target not found").into_response();
    };

    if req.url.as_deref().is_some_and(|url| url.trim().is_empty()) {
        return (StatusCode::BAD_REQUEST, "URL is required").into_response();
    }

    let update = TargetUpdate {
        url: req.url,
        validation: req.policy.validation_config.clone(),
        polling: req.policy.polling_change(existing.polling),
        client_identity: req.policy.user_agent_type,
    };

    if !state.store.update(&id, update) {
        return (StatusCode::NOT_FOUND, "Target not found").into_response();
    }

    match state.store.get(&id) {
        Some(target) => Json(TargetView::from(target)).into_response(),
        None => (StatusCode::NOT_FOUND, "Target not found").into_response(),
    }
}

pub async fn handle_delete_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if state.store.remove(&TargetId::from(id)) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn handle_toggle_pause(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.toggle_pause(&TargetId::from(id)) {
        Some(paused) => Json(json!({ "paused": paused })).into_response(),
        None => (StatusCode::NOT_FOUND, "Target not found").into_response(),
    }
}

pub async fn handle_toggle_pause_all(State(state): State<AppState>) -> impl IntoResponse {
    let paused = state.store.toggle_pause_all();
    Json(json!({ "paused": paused }))
}

// ============================================================================
// API: Checks and engine control
// ============================================================================

pub async fn handle_check_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = TargetId::from(id);
    if state.scheduler.check_now(&id).is_some() {
        return StatusCode::ACCEPTED.into_response();
    }

    match state.store.get(&id) {
        Some(target) if target.status == Status::Checking => {
            (StatusCode::CONFLICT, "Check already in progress").into_response()
        }
        _ => (StatusCode::NOT_FOUND, "Target not found").into_response(),
    }
}

pub async fn handle_check_all(State(state): State<AppState>) -> impl IntoResponse {
    let started = state.scheduler.check_all().len();
    (StatusCode::ACCEPTED, Json(json!({ "started": started })))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonitoringState {
    pub enabled: bool,
}

pub async fn handle_get_monitoring(State(state): State<AppState>) -> impl IntoResponse {
    Json(MonitoringState {
        enabled: state.scheduler.is_enabled(),
    })
}

pub async fn handle_set_monitoring(
    State(state): State<AppState>,
    Json(req): Json<MonitoringState>,
) -> impl IntoResponse {
    state.scheduler.set_enabled(req.enabled);
    Json(MonitoringState {
        enabled: state.scheduler.is_enabled(),
    })
}

pub async fn handle_summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "targets": state.store.summary(),
        "monitoring": state.scheduler.is_enabled(),
    }))
}

// ============================================================================
// API: Configuration, notifications, logs
// ============================================================================

pub async fn handle_get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.config())
}

pub async fn handle_update_config(
    State(state): State<AppState>,
    Json(config): Json<MonitorConfig>,
) -> impl IntoResponse {
    state.dispatcher.reconfigure(&config);
    state.store.set_config(config);
    Json(state.store.config())
}

pub async fn handle_test_notifications(State(state): State<AppState>) -> impl IntoResponse {
    let results = state.dispatcher.test_channels().await;
    if results.is_empty() {
        return (StatusCode::BAD_REQUEST, "No notification channels configured").into_response();
    }
    Json(results).into_response()
}

pub async fn handle_get_logs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.activity().entries())
}

pub async fn handle_clear_logs(State(state): State<AppState>) -> impl IntoResponse {
    state.store.activity().clear();
    StatusCode::NO_CONTENT
}

// ============================================================================
// API: Export / import
// ============================================================================

pub async fn handle_export(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.snapshot())
}

pub async fn handle_import(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let snapshot = match document::from_value(body) {
        Ok(snapshot) => snapshot,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    state.dispatcher.reconfigure(&snapshot.config);
    state.store.import(snapshot);
    Json(state.store.summary()).into_response()
}

// ============================================================================
// Relay
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
    #[serde(default, rename = "userAgentType")]
    pub identity: Option<ClientIdentity>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProxyResponse {
    pub ok: bool,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reachability probe on behalf of the presentation layer. Always answers 200;
/// the outcome is in the body.
pub async fn handle_proxy(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> impl IntoResponse {
    let url = query.url.as_deref().map(normalize_url).unwrap_or_default();
    if url.is_empty() {
        return Json(ProxyResponse {
            ok: false,
            status: 0,
            error: Some("URL missing".to_string()),
        });
    }

    let identity = query.identity.unwrap_or(ClientIdentity::ChromeDesktop);
    let response = match state.relay.probe(&url, identity).await {
        Ok(response) => ProxyResponse {
            ok: response.is_ok(),
            status: response.status,
            error: None,
        },
        Err(ProbeError::Timeout(_)) => ProxyResponse {
            ok: false,
            status: 0,
            error: Some("Timeout".to_string()),
        },
        Err(e) => {
            tracing::debug!("Proxy probe of {} failed: {}", url, e);
            ProxyResponse {
                ok: false,
                status: 0,
                error: Some("Connection Failed".to_string()),
            }
        }
    };
    Json(response)
}

pub async fn handle_health() -> impl IntoResponse {
    "OK"
}
