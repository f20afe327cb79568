//! Target, status, history and configuration types.
//!
//! The serialized shape is the camelCase snapshot document. Every field decodes
//! leniently: a missing or malformed value falls back to its default instead of
//! rejecting the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::ops::RangeInclusive;
use uuid::Uuid;

/// Maximum number of samples kept per target.
pub const HISTORY_CAPACITY: usize = 300;

/// Smallest fixed polling interval accepted.
pub const MIN_INTERVAL_SECS: u64 = 5;

/// Interval used when none is configured.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Bounds of the randomized jitter interval, inclusive.
pub const JITTER_RANGE_SECS: RangeInclusive<u64> = 5..=30;

/// Opaque, immutable target identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TargetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TargetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runtime status of a target.
///
/// `Checking` is transient; `Up` and `Down` are the settled states history and
/// incidents derive from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    #[serde(alias = "PAUSED")]
    Pending,
    Checking,
    Up,
    Down,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pending => write!(f, "pending"),
            Status::Checking => write!(f, "checking"),
            Status::Up => write!(f, "up"),
            Status::Down => write!(f, "down"),
        }
    }
}

/// Result of one completed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Up,
    Down,
}

impl From<Outcome> for Status {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Up => Status::Up,
            Outcome::Down => Status::Down,
        }
    }
}

/// A settled-state change that triggers notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Entered DOWN from PENDING or UP.
    WentDown,
    /// Left DOWN for UP.
    Restored,
}

/// One point of a target's latency/outcome series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySample {
    pub timestamp: i64,
    /// Present iff the outcome is UP.
    pub latency: Option<u64>,
    #[serde(rename = "status")]
    pub outcome: Outcome,
}

/// A contiguous DOWN interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub error: String,
}

impl Incident {
    pub fn open(start_time: i64, error: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            start_time,
            end_time: None,
            error: error.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Duration in milliseconds, or `None` while ongoing.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Rule deciding whether a raw probe response counts as UP.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "ValidationRepr", into = "ValidationRepr")]
pub enum ValidationRule {
    /// UP iff the HTTP status is in `[200, 400)`.
    #[default]
    StatusRange,
    /// UP iff the body parses as JSON and `body[key]` equals `value` as a string.
    JsonFieldEquals { key: String, value: String },
    /// UP iff the keyword occurs in the body, or is absent when `invert` is set.
    KeywordPresent { keyword: String, invert: bool },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationRepr {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    kind: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    json_key: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    json_value: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    keyword: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    invert_keyword: Option<bool>,
}

impl From<ValidationRepr> for ValidationRule {
    fn from(repr: ValidationRepr) -> Self {
        match repr.kind.as_str() {
            "JSON_EXACT" => ValidationRule::JsonFieldEquals {
                key: repr.json_key.unwrap_or_default(),
                value: repr.json_value.unwrap_or_default(),
            },
            "KEYWORD_MATCH" => ValidationRule::KeywordPresent {
                keyword: repr.keyword.unwrap_or_default(),
                invert: repr.invert_keyword.unwrap_or(false),
            },
            // DEFAULT, HTTP_STATUS and anything unrecognised
            _ => ValidationRule::StatusRange,
        }
    }
}

impl From<ValidationRule> for ValidationRepr {
    fn from(rule: ValidationRule) -> Self {
        match rule {
            ValidationRule::StatusRange => ValidationRepr {
                kind: "HTTP_STATUS".to_string(),
                ..Default::default()
            },
            ValidationRule::JsonFieldEquals { key, value } => ValidationRepr {
                kind: "JSON_EXACT".to_string(),
                json_key: Some(key),
                json_value: Some(value),
                ..Default::default()
            },
            ValidationRule::KeywordPresent { keyword, invert } => ValidationRepr {
                kind: "KEYWORD_MATCH".to_string(),
                keyword: Some(keyword),
                invert_keyword: Some(invert),
                ..Default::default()
            },
        }
    }
}

/// How often a target is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PollingRepr", into = "PollingRepr")]
pub enum PollingPolicy {
    /// Fixed interval, never below [`MIN_INTERVAL_SECS`].
    Fixed { interval_secs: u64 },
    /// Each check cycle draws its own gap from [`JITTER_RANGE_SECS`].
    ///
    /// The configured fixed interval is kept so switching jitter off restores it.
    Jitter { fallback_interval_secs: u64 },
}

impl PollingPolicy {
    /// Fixed policy, clamped to the minimum interval.
    pub fn fixed(interval_secs: u64) -> Self {
        PollingPolicy::Fixed {
            interval_secs: interval_secs.max(MIN_INTERVAL_SECS),
        }
    }

    /// Jitter policy remembering `interval_secs`, clamped like [`PollingPolicy::fixed`].
    pub fn jitter(interval_secs: u64) -> Self {
        PollingPolicy::Jitter {
            fallback_interval_secs: interval_secs.max(MIN_INTERVAL_SECS),
        }
    }

    pub fn is_jitter(&self) -> bool {
        matches!(self, PollingPolicy::Jitter { .. })
    }

    /// The fixed interval in effect, or remembered while jitter is on.
    pub fn interval_secs(&self) -> u64 {
        match *self {
            PollingPolicy::Fixed { interval_secs } => interval_secs,
            PollingPolicy::Jitter { fallback_interval_secs } => fallback_interval_secs,
        }
    }

    /// Same policy with the minimum interval enforced.
    pub fn clamped(self) -> Self {
        match self {
            PollingPolicy::Fixed { interval_secs } => PollingPolicy::fixed(interval_secs),
            PollingPolicy::Jitter { fallback_interval_secs } => {
                PollingPolicy::jitter(fallback_interval_secs)
            }
        }
    }
}

impl Default for PollingPolicy {
    fn default() -> Self {
        PollingPolicy::Fixed {
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollingRepr {
    #[serde(default = "default_interval_secs", deserialize_with = "lenient_interval")]
    interval_seconds: u64,
    #[serde(default, deserialize_with = "lenient")]
    use_random_interval: bool,
}

impl From<PollingRepr> for PollingPolicy {
    fn from(repr: PollingRepr) -> Self {
        if repr.use_random_interval {
            PollingPolicy::jitter(repr.interval_seconds)
        } else {
            PollingPolicy::fixed(repr.interval_seconds)
        }
    }
}

impl From<PollingPolicy> for PollingRepr {
    fn from(policy: PollingPolicy) -> Self {
        PollingRepr {
            interval_seconds: policy.interval_secs(),
            use_random_interval: policy.is_jitter(),
        }
    }
}

/// Client identity profile the relay presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientIdentity {
    #[default]
    Smart,
    ChromeDesktop,
    SafariIos,
    FirefoxDesktop,
    GoogleBot,
}

/// A monitored endpoint plus its policy and runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default = "TargetId::generate", deserialize_with = "lenient_id")]
    pub id: TargetId,
    #[serde(default, deserialize_with = "lenient")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Status,
    #[serde(default, deserialize_with = "lenient")]
    pub paused: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub last_checked: Option<i64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub last_response: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub failure_count: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub total_checks: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub total_down: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub history: VecDeque<HistorySample>,
    #[serde(default, deserialize_with = "lenient")]
    pub incidents: Vec<Incident>,
    #[serde(rename = "validationConfig", default, deserialize_with = "lenient")]
    pub validation: ValidationRule,
    #[serde(flatten)]
    pub polling: PollingPolicy,
    /// Gap in seconds drawn for the current jitter cycle.
    #[serde(
        rename = "currentRandomInterval",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_interval_secs: Option<u64>,
    #[serde(rename = "userAgentType", default, deserialize_with = "lenient")]
    pub client_identity: ClientIdentity,
}

impl Target {
    /// Build a fresh PENDING target from a spec.
    pub fn new(spec: TargetSpec, created_at: i64) -> Self {
        Self {
            id: TargetId::generate(),
            url: crate::probe::normalize_url(&spec.url),
            status: Status::Pending,
            paused: false,
            created_at,
            last_checked: None,
            last_response: None,
            failure_count: 0,
            total_checks: 0,
            total_down: 0,
            history: VecDeque::new(),
            incidents: Vec::new(),
            validation: spec.validation,
            polling: spec.polling,
            next_interval_secs: None,
            client_identity: spec.client_identity,
        }
    }

    /// The last settled status, ignoring a transient CHECKING.
    ///
    /// An open incident exists iff the target is DOWN, so the ledger decides.
    pub fn settled_status(&self) -> Status {
        if self.open_incident().is_some() {
            Status::Down
        } else if self.total_checks == 0 {
            Status::Pending
        } else {
            Status::Up
        }
    }

    pub fn open_incident(&self) -> Option<&Incident> {
        self.incidents.iter().rev().find(|i| i.is_open())
    }

    /// Seconds that must elapse after `last_checked` before the next check.
    pub fn effective_interval_secs(&self) -> u64 {
        match self.polling {
            PollingPolicy::Fixed { interval_secs } => interval_secs,
            PollingPolicy::Jitter { .. } => self
                .next_interval_secs
                .unwrap_or(*JITTER_RANGE_SECS.start()),
        }
    }

    /// Share of successful checks, 100.0 before the first check.
    pub fn uptime_percent(&self) -> f64 {
        if self.total_checks == 0 {
            return 100.0;
        }
        let up = self.total_checks.saturating_sub(self.total_down);
        up as f64 / self.total_checks as f64 * 100.0
    }

    /// Rounded mean latency over the UP samples in history.
    pub fn average_latency_ms(&self) -> u64 {
        let latencies: Vec<u64> = self.history.iter().filter_map(|s| s.latency).collect();
        if latencies.is_empty() {
            return 0;
        }
        let sum: u64 = latencies.iter().sum();
        (sum as f64 / latencies.len() as f64).round() as u64
    }
}

/// Editable fields supplied when adding a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub url: String,
    pub validation: ValidationRule,
    pub polling: PollingPolicy,
    pub client_identity: ClientIdentity,
}

impl TargetSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            validation: ValidationRule::default(),
            polling: PollingPolicy::default(),
            client_identity: ClientIdentity::default(),
        }
    }

    pub fn with_validation(mut self, validation: ValidationRule) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_polling(mut self, polling: PollingPolicy) -> Self {
        self.polling = polling;
        self
    }

    pub fn with_identity(mut self, client_identity: ClientIdentity) -> Self {
        self.client_identity = client_identity;
        self
    }
}

/// Partial edit of a target. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetUpdate {
    pub url: Option<String>,
    pub validation: Option<ValidationRule>,
    pub polling: Option<PollingPolicy>,
    pub client_identity: Option<ClientIdentity>,
}

/// Alert sound style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundVariant {
    #[default]
    Classic,
    Retro,
    Modern,
    Scifi,
    Subtle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Global monitor configuration stored alongside the targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    #[serde(deserialize_with = "lenient")]
    pub bot_token: String,
    #[serde(deserialize_with = "lenient")]
    pub chat_id: String,
    #[serde(deserialize_with = "lenient_interval")]
    pub default_interval_seconds: u64,
    #[serde(deserialize_with = "lenient")]
    pub use_random_interval: bool,
    #[serde(deserialize_with = "lenient")]
    pub sound_enabled: bool,
    #[serde(deserialize_with = "lenient")]
    pub sound_variant: SoundVariant,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub slack_webhook_url: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub discord_webhook_url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub theme: Theme,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            default_interval_seconds: DEFAULT_INTERVAL_SECS,
            use_random_interval: false,
            sound_enabled: false,
            sound_variant: SoundVariant::default(),
            slack_webhook_url: None,
            discord_webhook_url: None,
            theme: Theme::default(),
        }
    }
}

impl MonitorConfig {
    /// Polling policy for targets added without an explicit one.
    pub fn default_polling(&self) -> PollingPolicy {
        if self.use_random_interval {
            PollingPolicy::jitter(self.default_interval_seconds)
        } else {
            PollingPolicy::fixed(self.default_interval_seconds)
        }
    }
}

/// Serializable snapshot of the whole engine state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "apis", default, deserialize_with = "lenient_targets")]
    pub targets: Vec<Target>,
    #[serde(default, deserialize_with = "lenient")]
    pub config: MonitorConfig,
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

/// Decode a field, falling back to its default when the value is malformed.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Interval in seconds; zero, negative or non-numeric values become the default.
fn lenient_interval<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let secs = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|v| *v >= 1.0).map(|v| v.round() as u64))
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_INTERVAL_SECS);
    Ok(secs)
}

fn lenient_id<'de, D>(deserializer: D) -> Result<TargetId, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => TargetId(s),
        Value::Number(n) => TargetId(n.to_string()),
        _ => TargetId::generate(),
    };
    Ok(id)
}

/// Decode the target list, dropping entries that are not objects.
fn lenient_targets<'de, D>(deserializer: D) -> Result<Vec<Target>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Value::deserialize(deserializer)? {
        Value::Array(entries) => entries,
        _ => return Ok(Vec::new()),
    };
    let targets = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Target>(entry) {
            Ok(target) => Some(target),
            Err(e) => {
                tracing::warn!("Dropping unreadable target entry: {}", e);
                None
            }
        })
        .collect();
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_rule_wire_shape() {
        let rule = ValidationRule::KeywordPresent {
            keyword: "healthy".to_string(),
            invert: true,
        };
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value,
            json!({"type": "KEYWORD_MATCH", "keyword": "healthy", "invertKeyword": true})
        );

        let parsed: ValidationRule = serde_json::from_value(json!({
            "type": "JSON_EXACT",
            "jsonKey": "ok",
            "jsonValue": "true"
        }))
        .unwrap();
        assert_eq!(
            parsed,
            ValidationRule::JsonFieldEquals {
                key: "ok".to_string(),
                value: "true".to_string()
            }
        );

        // DEFAULT and unknown kinds fall back to the status range rule
        let parsed: ValidationRule = serde_json::from_value(json!({"type": "DEFAULT"})).unwrap();
        assert_eq!(parsed, ValidationRule::StatusRange);
        let parsed: ValidationRule = serde_json::from_value(json!({"type": "REGEX"})).unwrap();
        assert_eq!(parsed, ValidationRule::StatusRange);
    }

    #[test]
    fn test_partial_target_gets_defaults() {
        let target: Target = serde_json::from_value(json!({
            "id": "abc1234",
            "url": "https://example.com",
            "status": "UP",
            "totalChecks": 3,
        }))
        .unwrap();

        assert_eq!(target.id.as_str(), "abc1234");
        assert_eq!(target.status, Status::Up);
        assert_eq!(target.validation, ValidationRule::StatusRange);
        assert_eq!(target.client_identity, ClientIdentity::Smart);
        assert_eq!(target.polling, PollingPolicy::fixed(DEFAULT_INTERVAL_SECS));
        assert!(target.history.is_empty());
        assert!(target.incidents.is_empty());
        assert!(!target.paused);
    }

    #[test]
    fn test_malformed_fields_fall_back() {
        let target: Target = serde_json::from_value(json!({
            "id": 42,
            "url": "example.com",
            "status": "EXPLODED",
            "paused": "yes",
            "history": "not a list",
            "validationConfig": "nope",
            "intervalSeconds": 0,
            "userAgentType": "NETSCAPE",
        }))
        .unwrap();

        assert_eq!(target.id.as_str(), "42");
        assert_eq!(target.status, Status::Pending);
        assert!(!target.paused);
        assert!(target.history.is_empty());
        assert_eq!(target.validation, ValidationRule::StatusRange);
        assert_eq!(target.polling, PollingPolicy::fixed(DEFAULT_INTERVAL_SECS));
        assert_eq!(target.client_identity, ClientIdentity::Smart);
    }

    #[test]
    fn test_polling_policy_from_wire() {
        let target: Target = serde_json::from_value(json!({
            "id": "a", "url": "https://a.test", "intervalSeconds": 2, "useRandomInterval": false
        }))
        .unwrap();
        assert_eq!(target.polling, PollingPolicy::Fixed { interval_secs: MIN_INTERVAL_SECS });

        let target: Target = serde_json::from_value(json!({
            "id": "b", "url": "https://b.test", "intervalSeconds": 60, "useRandomInterval": true,
            "currentRandomInterval": 17
        }))
        .unwrap();
        assert_eq!(target.polling, PollingPolicy::jitter(60));
        assert_eq!(target.effective_interval_secs(), 17);
    }

    #[test]
    fn test_jitter_keeps_configured_interval() {
        let target: Target = serde_json::from_value(json!({
            "id": "c", "url": "https://c.test", "intervalSeconds": 30, "useRandomInterval": true
        }))
        .unwrap();
        assert_eq!(target.polling, PollingPolicy::Jitter { fallback_interval_secs: 30 });

        let value = serde_json::to_value(&target).unwrap();
        assert_eq!(value["intervalSeconds"], 30);
        assert_eq!(value["useRandomInterval"], true);

        let reloaded: Target = serde_json::from_value(value).unwrap();
        assert_eq!(reloaded.polling, target.polling);
    }

    #[test]
    fn test_settled_status_follows_ledger() {
        let mut target = Target::new(TargetSpec::new("example.com"), 0);
        assert_eq!(target.settled_status(), Status::Pending);

        target.total_checks = 1;
        assert_eq!(target.settled_status(), Status::Up);

        target.incidents.push(Incident::open(10, "Timeout"));
        target.status = Status::Checking;
        assert_eq!(target.settled_status(), Status::Down);
    }

    #[test]
    fn test_statistics() {
        let mut target = Target::new(TargetSpec::new("example.com"), 0);
        assert_eq!(target.uptime_percent(), 100.0);
        assert_eq!(target.average_latency_ms(), 0);

        target.total_checks = 4;
        target.total_down = 1;
        for (timestamp, latency) in [(1, Some(100)), (2, None), (3, Some(151))] {
            let outcome = if latency.is_some() { Outcome::Up } else { Outcome::Down };
            target.history.push_back(HistorySample { timestamp, latency, outcome });
        }

        assert_eq!(target.uptime_percent(), 75.0);
        assert_eq!(target.average_latency_ms(), 126);
    }

    #[test]
    fn test_monitor_config_defaults() {
        let config: MonitorConfig =
            serde_json::from_value(json!({"botToken": "t", "defaultIntervalSeconds": "x"}))
                .unwrap();
        assert_eq!(config.bot_token, "t");
        assert_eq!(config.default_interval_seconds, DEFAULT_INTERVAL_SECS);
        assert_eq!(config.theme, Theme::Dark);
        assert_eq!(config.default_polling(), PollingPolicy::fixed(60));

        let config = MonitorConfig {
            default_interval_seconds: 45,
            use_random_interval: true,
            ..MonitorConfig::default()
        };
        assert_eq!(config.default_polling(), PollingPolicy::jitter(45));
    }
}
