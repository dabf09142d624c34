use crate::Error;
use std::error::Error as StdError;
use std::fmt;

/// Synthetic rejection error: the circuit is Open and the call never
/// reached the wrapped operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CircuitOpenError;

impl fmt::Display for CircuitOpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit breaker is open")
    }
}

impl StdError for CircuitOpenError {}

/// Engine-specific wrapper carrying the breaker name and the underlying
/// cause, so callers can tell which breaker produced an error.
#[derive(Debug)]
pub struct BreakerError {
    name: String,
    source: Error,
}

impl BreakerError {
    pub fn new(name: impl Into<String>, source: Error) -> Self {
        BreakerError {
            name: name.into(),
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BreakerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit breaker '{}': {}", self.name, self.source)
    }
}

impl StdError for BreakerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

/// The caller's cancellation signal fired before or during the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelledError {
    reason: String,
}

impl CancelledError {
    pub fn new(reason: impl Into<String>) -> Self {
        CancelledError {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for CancelledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl StdError for CancelledError {}

/// Reports whether `err` is, or anywhere in its chain wraps, the
/// circuit-open rejection.
pub fn is_circuit_open(err: &Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<CircuitOpenError>().is_some())
}
