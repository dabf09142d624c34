use super::counter::{ConsecutiveCounter, RollingWindowCounter};
use super::error::{BreakerError, CircuitOpenError};
use super::events::Callbacks;
use super::metrics::Metrics;
use super::settings::Settings;
use super::state_machine::{State, StateMachine, TransitionHook};
use super::timer::DelayedTask;
use super::token::CancelToken;
use crate::{logging, Error, Result};
use std::sync::{Arc, Mutex, Weak};

/// The decision engine tying state machine, counters, threshold policy and
/// timers together. Gates calls to an unreliable dependency: while Closed,
/// calls pass and failures are counted; once the threshold policy signals,
/// the circuit trips Open and rejects everything; after the open timeout it
/// probes via HalfOpen, where trial calls run one at a time.
///
/// Handles are cheap clones sharing one engine; every method is safe to
/// call from any thread. Observers run synchronously under the transition
/// lock and must not call back into the breaker.
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<Shared>,
}

struct Shared {
    name: String,
    settings: Settings,
    machine: StateMachine,
    consecutive: ConsecutiveCounter,
    // allocated only for rate-based policies
    window: Option<RollingWindowCounter>,
    callbacks: Callbacks,
    // serializes HalfOpen probes; also taken by the decay timer so counter
    // wipes never interleave with an in-flight probe's bookkeeping
    exec_lock: Mutex<()>,
    open_timer: Mutex<Option<DelayedTask>>,
    reset_timer: Mutex<Option<DelayedTask>>,
}

impl CircuitBreaker {
    /// Builds a breaker from `settings`, normalizing them first. The
    /// rolling window is allocated only when the policy is rate-based; the
    /// decay timer is armed right away when a reset timeout is configured.
    pub fn new(settings: Settings) -> Self {
        let settings = settings.normalized();
        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let hook_handle = weak.clone();
            let hook: TransitionHook = Box::new(move |prev, next| {
                if let Some(shared) = hook_handle.upgrade() {
                    Shared::on_transition(&shared, prev, next);
                }
            });
            let window = if settings.failure_threshold.is_rate_based() {
                Some(RollingWindowCounter::new(
                    settings.rolling_window,
                    settings.window_bucket_count,
                ))
            } else {
                None
            };
            Shared {
                name: settings.name.clone(),
                machine: StateMachine::new(hook),
                consecutive: ConsecutiveCounter::new(),
                window,
                callbacks: Callbacks::new(),
                exec_lock: Mutex::new(()),
                open_timer: Mutex::new(None),
                reset_timer: Mutex::new(None),
                settings,
            }
        });
        if !shared.settings.reset_timeout.is_zero() {
            Shared::arm_reset_timer(&shared);
        }
        CircuitBreaker { shared }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> State {
        self.shared.machine.current_state()
    }

    /// Runs `op` if the circuit admits it. While Open the call is rejected
    /// with a [`CircuitOpenError`] (wrapped in a [`BreakerError`] carrying
    /// this breaker's name) and `op` is never invoked. While HalfOpen the
    /// call is serialized against every other probe. The operation's own
    /// result always flows back unchanged; classification only decides
    /// whether counters and state move.
    pub fn execute<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.run(None, op)
    }

    /// Like [`execute`](Self::execute), with a cooperative cancellation
    /// signal. A token already cancelled at admission fails immediately
    /// with its cancellation reason and `op` is never invoked; afterwards
    /// the engine relies entirely on `op` observing the token.
    pub fn execute_cancellable<T, F>(&self, token: &CancelToken, op: F) -> Result<T>
    where
        F: FnOnce(&CancelToken) -> Result<T>,
    {
        self.run(Some(token), || op(token))
    }

    /// Calls `op` through the breaker and, on any returned error
    /// (rejections included), hands it to `fallback` and returns the
    /// fallback's result instead.
    pub fn execute_with_fallback<T, F, FB>(&self, op: F, fallback: FB) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
        FB: FnOnce(Error) -> Result<T>,
    {
        match self.execute(op) {
            Ok(value) => Ok(value),
            Err(err) => fallback(err),
        }
    }

    /// Cancellable variant of
    /// [`execute_with_fallback`](Self::execute_with_fallback).
    pub fn execute_cancellable_with_fallback<T, F, FB>(
        &self,
        token: &CancelToken,
        op: F,
        fallback: FB,
    ) -> Result<T>
    where
        F: FnOnce(&CancelToken) -> Result<T>,
        FB: FnOnce(&CancelToken, Error) -> Result<T>,
    {
        match self.execute_cancellable(token, op) {
            Ok(value) => Ok(value),
            Err(err) => fallback(token, err),
        }
    }

    /// Assembles a point-in-time snapshot. Totals come from the rolling
    /// window when one exists, else from the consecutive counter.
    pub fn metrics(&self) -> Metrics {
        let shared = &self.shared;
        let (total_requests, total_failures) = match &shared.window {
            Some(window) => window.counts(),
            None => {
                let (successes, failures) = shared.consecutive.totals();
                (successes + failures, failures)
            }
        };
        Metrics {
            name: shared.name.clone(),
            state: shared.machine.current_state(),
            total_requests,
            total_failures,
            consecutive_failures: shared.consecutive.consecutive_failures(),
            consecutive_successes: shared.consecutive.consecutive_successes(),
            last_state_change_ms: shared.machine.last_change_ms(),
            time_in_state: shared.machine.time_in_state(),
        }
    }

    /// Cancels both timers. Idempotent, callable from any state. Calls
    /// keep being gated per the current state afterwards, but no further
    /// timer-driven transitions occur.
    pub fn shutdown(&self) {
        self.shared.cancel_timers();
    }

    pub fn on_state_change<F>(&self, callback: F)
    where
        F: Fn(&str, State, State) + Send + Sync + 'static,
    {
        self.shared.callbacks.add_on_state_change(Box::new(callback));
    }

    pub fn on_trip<F>(&self, callback: F)
    where
        F: Fn(&str, Option<&Error>) + Send + Sync + 'static,
    {
        self.shared.callbacks.add_on_trip(Box::new(callback));
    }

    pub fn on_reset<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared.callbacks.add_on_reset(Box::new(callback));
    }

    pub fn on_success<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared.callbacks.add_on_success(Box::new(callback));
    }

    pub fn on_failure<F>(&self, callback: F)
    where
        F: Fn(&str, &Error) + Send + Sync + 'static,
    {
        self.shared.callbacks.add_on_failure(Box::new(callback));
    }

    pub fn on_rejection<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared.callbacks.add_on_rejection(Box::new(callback));
    }

    fn run<T, F>(&self, token: Option<&CancelToken>, op: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let shared = &self.shared;

        if let Some(token) = token {
            if token.is_cancelled() {
                return Err(token.cancellation_error());
            }
        }

        let _probe_guard = match shared.machine.current_state() {
            State::Open => {
                shared.callbacks.notify_rejection(&shared.name);
                logging::debug!("[CircuitBreaker '{}'] call rejected, circuit is open", shared.name);
                return Err(Error::new(BreakerError::new(
                    shared.name.clone(),
                    Error::new(CircuitOpenError),
                )));
            }
            // queue concurrent probes one at a time for the rest of the call
            State::HalfOpen => Some(shared.exec_lock.lock().unwrap()),
            State::Closed => None,
        };

        let result = op();

        match &result {
            Ok(_) => shared.record_success(),
            Err(err) => {
                if shared.is_failure(err) {
                    shared.record_failure(err);
                }
            }
        }
        result
    }
}

impl Shared {
    /// Classification: custom predicate wins; otherwise an error matching
    /// the ignored list is not a failure; otherwise every error is.
    fn is_failure(&self, err: &Error) -> bool {
        if let Some(predicate) = &self.settings.is_failure {
            return predicate(err);
        }
        let rendered = err.to_string();
        if self
            .settings
            .ignored_errors
            .iter()
            .any(|ignored| *ignored == rendered)
        {
            return false;
        }
        true
    }

    fn record_success(&self) {
        self.callbacks.notify_success(&self.name);
        self.consecutive.record_success();
        if let Some(window) = &self.window {
            window.record_success();
        }
        if self.machine.is_half_open()
            && self.consecutive.consecutive_successes() >= self.settings.success_threshold
        {
            // the transition hook re-arms the decay timer on entering Closed
            self.machine.transition_to(State::Closed);
            self.consecutive.reset();
            if let Some(window) = &self.window {
                window.reset();
            }
        }
    }

    fn record_failure(&self, err: &Error) {
        self.callbacks.notify_failure(&self.name, err);
        self.consecutive.record_failure();
        if let Some(window) = &self.window {
            window.record_failure();
        }

        // a single failed probe reopens the circuit
        if self.machine.is_half_open() {
            self.machine.transition_to(State::Open);
            return;
        }

        if self.machine.is_closed() && self.should_trip() {
            self.machine.transition_to(State::Open);
            self.callbacks.notify_trip(&self.name, Some(err));
            logging::info!(
                "[CircuitBreaker '{}'] tripped by {}: {}",
                self.name,
                self.settings.failure_threshold,
                err
            );
        }
    }

    fn should_trip(&self) -> bool {
        let policy = &self.settings.failure_threshold;
        if policy.is_rate_based() {
            match &self.window {
                Some(window) => {
                    let (requests, failures) = window.counts();
                    requests >= self.settings.minimum_request_volume
                        && policy.should_trip(
                            failures,
                            0,
                            requests,
                            self.settings.rolling_window,
                        )
                }
                None => false,
            }
        } else {
            policy.should_trip(
                self.consecutive.consecutive_failures(),
                self.consecutive.consecutive_successes(),
                0,
                self.settings.rolling_window,
            )
        }
    }

    /// Transition hook: fan out notifications and manage the two timers.
    /// Runs under the state machine lock, so transitions are applied and
    /// announced atomically.
    fn on_transition(this: &Arc<Shared>, prev: State, next: State) {
        logging::debug!(
            "[CircuitBreaker '{}'] state changed: {} -> {}",
            this.name,
            prev,
            next
        );
        this.callbacks.notify_state_change(&this.name, prev, next);
        if prev == State::Closed && next == State::Open {
            this.callbacks.notify_trip(&this.name, None);
        }
        if (prev == State::Open || prev == State::HalfOpen) && next == State::Closed {
            this.callbacks.notify_reset(&this.name);
        }
        if next == State::Open {
            Self::arm_open_timer(this);
        }
        if next == State::Closed && !this.settings.reset_timeout.is_zero() {
            Self::arm_reset_timer(this);
        }
    }

    /// (Re-)arms the open timeout, replacing any pending timer. On firing
    /// the circuit moves to HalfOpen for probing.
    fn arm_open_timer(this: &Arc<Shared>) {
        let mut slot = this.open_timer.lock().unwrap();
        if let Some(task) = slot.take() {
            task.cancel();
        }
        let handle = Arc::downgrade(this);
        *slot = Some(DelayedTask::spawn(this.settings.timeout, move || {
            if let Some(shared) = handle.upgrade() {
                shared.machine.transition_to(State::HalfOpen);
            }
        }));
    }

    /// (Re-)arms the closed-state decay timer. If the breaker is still
    /// Closed when it fires, both counters get a clean slate.
    fn arm_reset_timer(this: &Arc<Shared>) {
        let mut slot = this.reset_timer.lock().unwrap();
        if let Some(task) = slot.take() {
            task.cancel();
        }
        let handle = Arc::downgrade(this);
        *slot = Some(DelayedTask::spawn(this.settings.reset_timeout, move || {
            if let Some(shared) = handle.upgrade() {
                let _guard = shared.exec_lock.lock().unwrap();
                if shared.machine.is_closed() {
                    shared.consecutive.reset();
                    if let Some(window) = &shared.window {
                        window.reset();
                    }
                }
            }
        }));
    }

    fn cancel_timers(&self) {
        if let Some(task) = self.open_timer.lock().unwrap().take() {
            task.cancel();
        }
        if let Some(task) = self.reset_timer.lock().unwrap().take() {
            task.cancel();
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}
