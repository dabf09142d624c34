use super::error::CancelledError;
use crate::{utils, Error};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CANCELLED_REASON: &str = "operation cancelled";
const DEADLINE_REASON: &str = "deadline exceeded";

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
    // unix millis; zero means no deadline
    deadline_ms: AtomicU64,
}

/// Cooperative cancellation signal for gated calls. Cloned handles share
/// the same state. The engine checks it once at admission; after that the
/// wrapped operation is responsible for observing it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that reports cancelled once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        let token = Self::new();
        token.inner.deadline_ms.store(
            utils::curr_time_millis() + timeout.as_millis() as u64,
            Ordering::SeqCst,
        );
        token
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn cancel_with_reason(&self, reason: impl Into<String>) {
        *self.inner.reason.lock().unwrap() = Some(reason.into());
        self.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        let deadline = self.inner.deadline_ms.load(Ordering::SeqCst);
        deadline != 0 && utils::curr_time_millis() >= deadline
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        match self.inner.deadline_ms.load(Ordering::SeqCst) {
            0 => None,
            deadline => Some(deadline),
        }
    }

    /// The error describing why this token is cancelled.
    pub fn cancellation_error(&self) -> Error {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            let reason = self
                .inner
                .reason
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| CANCELLED_REASON.into());
            return Error::new(CancelledError::new(reason));
        }
        Error::new(CancelledError::new(DEADLINE_REASON))
    }
}
