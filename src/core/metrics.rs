use super::state_machine::State;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Point-in-time snapshot of one breaker, assembled on demand. Totals come
/// from the rolling window when the active policy is rate-based, otherwise
/// from the consecutive counter's lifetime totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub name: String,
    pub state: State,
    pub total_requests: u64,
    pub total_failures: u64,
    pub consecutive_failures: u64,
    pub consecutive_successes: u64,
    /// Unix millis of the last state change.
    pub last_state_change_ms: u64,
    pub time_in_state: Duration,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmtted = serde_json::to_string_pretty(self).unwrap();
        write!(f, "{}", fmtted)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_is_json() {
        let metrics = Metrics {
            name: "default".into(),
            state: State::Closed,
            total_requests: 10,
            total_failures: 4,
            consecutive_failures: 2,
            consecutive_successes: 0,
            last_state_change_ms: 1_976_296_040_000,
            time_in_state: Duration::from_millis(1500),
        };
        let rendered = metrics.to_string();
        assert!(rendered.contains("\"state\": \"Closed\""));
        assert!(rendered.contains("\"total_requests\": 10"));
    }
}
