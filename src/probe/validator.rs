//! Classification of raw relay responses against a target's validation rule.

use serde_json::Value;

use super::RelayResponse;
use crate::store::ValidationRule;

/// Up/down decision plus a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub up: bool,
    pub detail: String,
}

impl Verdict {
    fn up(detail: impl Into<String>) -> Self {
        Self { up: true, detail: detail.into() }
    }

    fn down(detail: impl Into<String>) -> Self {
        Self { up: false, detail: detail.into() }
    }
}

/// Decide whether `response` counts as UP under `rule`.
///
/// Never fails: a malformed body yields a DOWN verdict explaining why.
pub fn classify(rule: &ValidationRule, response: &RelayResponse) -> Verdict {
    match rule {
        ValidationRule::StatusRange => {
            if response.is_ok() {
                Verdict::up(format!("HTTP {}", response.status))
            } else {
                Verdict::down(format!("HTTP {}", response.status))
            }
        }
        ValidationRule::JsonFieldEquals { key, value } => {
            let body: Value = match serde_json::from_str(&response.body) {
                Ok(v) => v,
                Err(e) => return Verdict::down(format!("Invalid JSON: {}", e)),
            };
            match body.get(key.as_str()) {
                None => Verdict::down(format!("Key \"{}\" not found", key)),
                Some(actual) => {
                    let actual = json_as_text(actual);
                    if actual == *value {
                        Verdict::up(format!("{} = {}", key, actual))
                    } else {
                        Verdict::down(format!("Expected {} = {}, got {}", key, value, actual))
                    }
                }
            }
        }
        ValidationRule::KeywordPresent { keyword, invert } => {
            let found = response.body.contains(keyword.as_str());
            match (found, *invert) {
                (true, false) => Verdict::up(format!("Keyword \"{}\" found", keyword)),
                (false, true) => Verdict::up(format!("Keyword \"{}\" absent", keyword)),
                (false, false) => Verdict::down(format!("Keyword \"{}\" not found", keyword)),
                (true, true) => Verdict::down(format!("Unwanted keyword \"{}\" found", keyword)),
            }
        }
    }
}

/// String form used for comparison: strings unquoted, everything else as JSON.
fn json_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> RelayResponse {
        RelayResponse { status, body: body.to_string() }
    }

    #[test]
    fn test_status_range() {
        let rule = ValidationRule::StatusRange;
        assert!(classify(&rule, &response(200, "")).up);
        assert!(classify(&rule, &response(302, "")).up);
        let verdict = classify(&rule, &response(500, ""));
        assert!(!verdict.up);
        assert_eq!(verdict.detail, "HTTP 500");
    }

    #[test]
    fn test_json_field_equals() {
        let rule = ValidationRule::JsonFieldEquals {
            key: "status".to_string(),
            value: "ok".to_string(),
        };
        assert!(classify(&rule, &response(200, r#"{"status":"ok"}"#)).up);
        assert!(!classify(&rule, &response(200, r#"{"status":"degraded"}"#)).up);
        assert!(!classify(&rule, &response(200, r#"{"other":"ok"}"#)).up);

        let verdict = classify(&rule, &response(200, "<html>"));
        assert!(!verdict.up);
        assert!(verdict.detail.starts_with("Invalid JSON"));
    }

    #[test]
    fn test_json_non_string_values_compare_as_text() {
        let rule = ValidationRule::JsonFieldEquals {
            key: "ok".to_string(),
            value: "true".to_string(),
        };
        assert!(classify(&rule, &response(200, r#"{"ok":true}"#)).up);

        let rule = ValidationRule::JsonFieldEquals {
            key: "count".to_string(),
            value: "3".to_string(),
        };
        assert!(classify(&rule, &response(200, r#"{"count":3}"#)).up);
    }

    #[test]
    fn test_json_array_body_is_down() {
        let rule = ValidationRule::JsonFieldEquals {
            key: "ok".to_string(),
            value: "true".to_string(),
        };
        assert!(!classify(&rule, &response(200, "[1,2,3]")).up);
    }

    #[test]
    fn test_keyword_present_and_inverted() {
        let present = ValidationRule::KeywordPresent {
            keyword: "healthy".to_string(),
            invert: false,
        };
        let absent = ValidationRule::KeywordPresent {
            keyword: "maintenance".to_string(),
            invert: true,
        };

        assert!(classify(&present, &response(200, "all systems healthy")).up);
        assert!(!classify(&present, &response(200, "degraded")).up);
        assert!(classify(&absent, &response(200, "all good")).up);
        assert!(!classify(&absent, &response(200, "down for maintenance")).up);
    }
}
