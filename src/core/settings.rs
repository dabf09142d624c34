use super::config::*;
use super::policy::ThresholdPolicy;
use crate::{utils, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Custom failure classifier. When present its verdict overrides every
/// other classification rule, including the ignored-error list.
pub type FailurePredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Immutable configuration snapshot for one circuit breaker. Malformed
/// values are normalized at construction, never rejected.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Identifier carried in every notification and log record.
    pub name: String,
    /// Strategy deciding when the circuit trips from Closed.
    pub failure_threshold: ThresholdPolicy,
    /// Consecutive successes required to close from HalfOpen.
    pub success_threshold: u64,
    /// How long the circuit stays Open before probing via HalfOpen.
    pub timeout: Duration,
    /// Span of the trailing window backing rate-based policies.
    pub rolling_window: Duration,
    /// Bucket count of the rolling window; zero falls back to the default.
    pub window_bucket_count: u32,
    /// Requests that must fall inside the window before the failure rate
    /// is evaluated at all.
    pub minimum_request_volume: u64,
    /// While Closed, a quiet period of this length wipes the failure
    /// counters. Zero disables the decay timer.
    pub reset_timeout: Duration,
    /// Custom failure classifier; `None` means any error is a failure
    /// unless it matches `ignored_errors`.
    #[serde(skip)]
    pub is_failure: Option<FailurePredicate>,
    /// Rendered error messages excluded from failure classification. The
    /// error still propagates to the caller unchanged.
    pub ignored_errors: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            name: DEFAULT_BREAKER_NAME.into(),
            failure_threshold: ThresholdPolicy::default(),
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            timeout: Duration::from_millis(DEFAULT_OPEN_TIMEOUT_MS),
            rolling_window: Duration::from_millis(DEFAULT_ROLLING_WINDOW_MS),
            window_bucket_count: DEFAULT_WINDOW_BUCKET_COUNT,
            minimum_request_volume: DEFAULT_MINIMUM_REQUEST_VOLUME,
            reset_timeout: Duration::from_millis(0),
            is_failure: None,
            ignored_errors: Vec::new(),
        }
    }
}

impl Settings {
    /// Applies the normalization rules: a blank name becomes the default
    /// one. Bucket-count fallback happens where the window is built.
    pub(crate) fn normalized(mut self) -> Self {
        if utils::is_blank(&self.name) {
            self.name = DEFAULT_BREAKER_NAME.into();
        }
        self
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("name", &self.name)
            .field("failure_threshold", &self.failure_threshold)
            .field("success_threshold", &self.success_threshold)
            .field("timeout", &self.timeout)
            .field("rolling_window", &self.rolling_window)
            .field("window_bucket_count", &self.window_bucket_count)
            .field("minimum_request_volume", &self.minimum_request_volume)
            .field("reset_timeout", &self.reset_timeout)
            .field("is_failure", &self.is_failure.is_some())
            .field("ignored_errors", &self.ignored_errors)
            .finish()
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmtted = serde_json::to_string_pretty(self).unwrap();
        write!(f, "{}", fmtted)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.name, "default");
        assert_eq!(settings.failure_threshold, ThresholdPolicy::consecutive(5));
        assert_eq!(settings.success_threshold, 1);
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.rolling_window, Duration::from_secs(10));
        assert_eq!(settings.window_bucket_count, 10);
        assert_eq!(settings.minimum_request_volume, 3);
        assert_eq!(settings.reset_timeout, Duration::from_millis(0));
        assert!(settings.is_failure.is_none());
        assert!(settings.ignored_errors.is_empty());
    }

    #[test]
    fn blank_name_normalizes_to_default() {
        let cases = vec!["", "   ", "\t\n"];
        for name in cases {
            let settings = Settings {
                name: name.into(),
                ..Default::default()
            }
            .normalized();
            assert_eq!(settings.name, "default");
        }
        let named = Settings {
            name: "upstream-api".into(),
            ..Default::default()
        }
        .normalized();
        assert_eq!(named.name, "upstream-api");
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let settings: Settings =
            serde_json::from_str(r#"{"name":"payments","success_threshold":3}"#).unwrap();
        assert_eq!(settings.name, "payments");
        assert_eq!(settings.success_threshold, 3);
        assert_eq!(settings.minimum_request_volume, 3);
        assert!(settings.is_failure.is_none());
    }

    #[test]
    fn display_is_json() {
        let settings = Settings {
            is_failure: Some(Arc::new(|_: &Error| true)),
            ..Default::default()
        };
        let rendered = settings.to_string();
        assert!(rendered.contains("\"name\": \"default\""));
    }
}
