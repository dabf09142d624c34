use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// `ThresholdPolicy` decides, from current failure counts, whether the
/// circuit should trip. The two variants form a closed set; both are pure
/// value types, safe to evaluate from any thread.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum ThresholdPolicy {
    /// Trips once the unbroken run of failures reaches `threshold`.
    ConsecutiveFailures { threshold: u64 },
    /// Trips once at least `min_samples` requests fell inside the rolling
    /// window and the failure ratio reaches `rate`.
    FailureRate { rate: f64, min_samples: u64 },
}

impl ThresholdPolicy {
    /// Consecutive-failure policy tripping at `threshold` failures in a row.
    pub fn consecutive(threshold: u64) -> Self {
        ThresholdPolicy::ConsecutiveFailures { threshold }
    }

    /// Failure-rate policy tripping at `rate` over at least `min_samples`
    /// windowed requests.
    pub fn failure_rate(rate: f64, min_samples: u64) -> Self {
        ThresholdPolicy::FailureRate { rate, min_samples }
    }

    /// Whether the circuit should trip given the current counts. For the
    /// consecutive variant only `failures` matters; for the rate variant
    /// `failures` and `total` are the windowed counts.
    pub fn should_trip(
        &self,
        failures: u64,
        _successes: u64,
        total: u64,
        _window: Duration,
    ) -> bool {
        match *self {
            ThresholdPolicy::ConsecutiveFailures { threshold } => failures >= threshold,
            ThresholdPolicy::FailureRate { rate, min_samples } => {
                if total < min_samples {
                    return false;
                }
                failures as f64 / total as f64 >= rate
            }
        }
    }

    /// Rate-based policies need the rolling window counter; the engine
    /// allocates one iff this returns true.
    pub fn is_rate_based(&self) -> bool {
        matches!(self, ThresholdPolicy::FailureRate { .. })
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::consecutive(crate::core::config::DEFAULT_CONSECUTIVE_FAILURE_THRESHOLD)
    }
}

impl fmt::Display for ThresholdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdPolicy::ConsecutiveFailures { .. } => write!(f, "ConsecutiveFailures"),
            ThresholdPolicy::FailureRate { .. } => write!(f, "FailureRate"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(10);

    #[test]
    fn consecutive_trips_at_threshold() {
        let policy = ThresholdPolicy::consecutive(3);
        let cases = vec![
            (0, false),
            (1, false),
            (2, false),
            (3, true),
            (4, true),
        ];
        for (failures, expected) in cases {
            assert_eq!(policy.should_trip(failures, 0, 0, WINDOW), expected);
        }
    }

    #[test]
    fn consecutive_ignores_other_arguments() {
        let policy = ThresholdPolicy::consecutive(3);
        assert!(policy.should_trip(3, 100, 1, Duration::from_millis(1)));
        assert!(!policy.should_trip(2, 0, 1000, WINDOW));
    }

    #[test]
    fn rate_requires_minimum_samples() {
        let policy = ThresholdPolicy::failure_rate(0.5, 10);
        for total in 0..10 {
            assert!(!policy.should_trip(total, 0, total, WINDOW));
        }
        let cases = vec![(4, false), (5, true), (6, true), (10, true)];
        for (failures, expected) in cases {
            assert_eq!(policy.should_trip(failures, 0, 10, WINDOW), expected);
        }
    }

    #[test]
    fn rate_is_a_ratio_over_total() {
        let policy = ThresholdPolicy::failure_rate(0.25, 4);
        assert!(!policy.should_trip(24, 0, 100, WINDOW));
        assert!(policy.should_trip(25, 0, 100, WINDOW));
    }

    #[test]
    fn variant_kind() {
        assert!(!ThresholdPolicy::consecutive(1).is_rate_based());
        assert!(ThresholdPolicy::failure_rate(0.5, 1).is_rate_based());
        assert_eq!(
            ThresholdPolicy::default(),
            ThresholdPolicy::consecutive(5)
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(
            ThresholdPolicy::consecutive(3).to_string(),
            "ConsecutiveFailures"
        );
        assert_eq!(
            ThresholdPolicy::failure_rate(0.5, 10).to_string(),
            "FailureRate"
        );
    }
}
