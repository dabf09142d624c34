use std::sync::Mutex;

#[derive(Debug, Default)]
struct ConsecutiveInner {
    consecutive_successes: u64,
    consecutive_failures: u64,
    total_successes: u64,
    total_failures: u64,
}

/// Tracks unbroken runs of successes and failures plus lifetime totals.
/// A success resets the failure run and vice versa, so at most one of the
/// two consecutive fields is nonzero at any time. Pure counter, no policy
/// knowledge.
#[derive(Debug, Default)]
pub(crate) struct ConsecutiveCounter {
    inner: Mutex<ConsecutiveInner>,
}

impl ConsecutiveCounter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_successes += 1;
        inner.consecutive_failures = 0;
        inner.total_successes += 1;
    }

    pub(crate) fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures += 1;
        inner.consecutive_successes = 0;
        inner.total_failures += 1;
    }

    pub(crate) fn consecutive_successes(&self) -> u64 {
        self.inner.lock().unwrap().consecutive_successes
    }

    pub(crate) fn consecutive_failures(&self) -> u64 {
        self.inner.lock().unwrap().consecutive_failures
    }

    /// Lifetime (successes, failures) since creation or the last reset.
    pub(crate) fn totals(&self) -> (u64, u64) {
        let inner = self.inner.lock().unwrap();
        (inner.total_successes, inner.total_failures)
    }

    pub(crate) fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = ConsecutiveInner::default();
    }
}
