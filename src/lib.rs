#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Fusebox
//!
//! Fusebox wraps calls to an unreliable dependency behind the circuit
//! breaker pattern: outcomes are tracked, the circuit trips Open once the
//! dependency looks unhealthy, rejected calls fail fast, and the breaker
//! periodically probes for recovery through a half-open trial phase.
//!
//! Each breaker is an independent, in-memory, single-process guard. There
//! is no cross-process coordination and no persistence; thresholds are
//! fixed for the life of the breaker.
//!
//! ## Add Dependency
//!
//! ```toml
//! [dependencies]
//! fusebox = { version = "0.1.0" }
//! ```
//!
//! Optional features:
//! - logger_env: Use `env_logger` to initialize logging.
//! - logger_log4rs: Use `log4rs` to initialize logging.
//!
//! ## Gating Calls
//!
//! Build a breaker from [`Settings`] and route calls through
//! [`CircuitBreaker::execute`]. The operation's result always flows back to
//! the caller; the breaker only decides whether the call is admitted and
//! how its outcome counts.
//!
//! ```rust
//! use fusebox::{CircuitBreaker, Settings, ThresholdPolicy};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(Settings {
//!     name: "billing-api".into(),
//!     failure_threshold: ThresholdPolicy::consecutive(5),
//!     timeout: Duration::from_secs(30),
//!     ..Default::default()
//! });
//!
//! let reply = breaker.execute(|| call_billing_service());
//! match reply {
//!     Ok(reply) => handle(reply),
//!     Err(err) if fusebox::is_circuit_open(&err) => serve_cached_answer(),
//!     Err(err) => log_and_fail(err),
//! }
//! ```
//!
//! Rate-based tripping keeps a rolling window of recent outcomes instead of
//! a consecutive run:
//!
//! ```rust
//! use fusebox::{Settings, ThresholdPolicy};
//! use std::time::Duration;
//!
//! let settings = Settings {
//!     failure_threshold: ThresholdPolicy::failure_rate(0.5, 20),
//!     rolling_window: Duration::from_secs(10),
//!     minimum_request_volume: 10,
//!     ..Default::default()
//! };
//! ```
//!
//! ## Observing Events
//!
//! Observers register per event kind and run synchronously on the thread
//! that triggered the event; [`logging::attach_event_loggers`] wires every
//! event to the `log` facade.
//!
//! ```rust
//! breaker.on_trip(|name, err| {
//!     page_oncall(name, err);
//! });
//! ```

/// Core implementations: the breaker engine, the state machine, the outcome
/// counters, the threshold policies and the supporting value types.
pub mod core;
/// Adapters for different logging crates.
pub mod logging;
// Utility functions.
pub mod utils;

// re-export preludes
pub use crate::core::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
