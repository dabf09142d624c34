//!  Circuit Breaker State Machine:
//!
//!                                switch to open based on policy
//!
//!             +-----------------------------------------------------------------------+
//!             |                                                                       |
//!             |                                                                       v
//!     +----------------+                   +----------------+   Open timeout   +----------------+
//!     |                |                   |                |<-----------------|                |
//!     |                |  Probes succeed   |                |                  |                |
//!     |     Closed     |<------------------|    HalfOpen    |                  |      Open      |
//!     |                |                   |                |   Probe failed   |                |
//!     |                |                   |                +----------------->|                |
//!     +----------------+                   +----------------+                  +----------------+

use crate::utils;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

/// States of the circuit breaker state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum State {
    /// Calls pass through; failures are counted against the threshold policy.
    Closed,
    /// Calls are rejected immediately without reaching the dependency.
    Open,
    /// Trial calls pass one at a time to test whether the dependency recovered.
    HalfOpen,
}

impl Default for State {
    fn default() -> State {
        State::Closed
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Closed => write!(f, "Closed"),
            State::Open => write!(f, "Open"),
            State::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

impl State {
    /// Reports whether `from -> to` is one of the legal transitions.
    /// The machine itself does not enforce this; the engine only requests
    /// legal transitions.
    pub fn is_valid_transition(from: State, to: State) -> bool {
        match from {
            State::Closed => to == State::Open,
            State::Open => to == State::HalfOpen,
            State::HalfOpen => to == State::Closed || to == State::Open,
        }
    }
}

pub(crate) type TransitionHook = Box<dyn Fn(State, State) + Send + Sync>;

#[derive(Default)]
struct MachineInner {
    state: State,
    last_change_ms: u64,
}

/// Holds the current state and the timestamp of the last change, and invokes
/// the transition hook synchronously under the same lock that serializes
/// transition application.
pub(crate) struct StateMachine {
    inner: Mutex<MachineInner>,
    hook: TransitionHook,
}

impl StateMachine {
    pub(crate) fn new(hook: TransitionHook) -> Self {
        StateMachine {
            inner: Mutex::new(MachineInner {
                state: State::default(),
                last_change_ms: utils::curr_time_millis(),
            }),
            hook,
        }
    }

    pub(crate) fn current_state(&self) -> State {
        self.inner.lock().unwrap().state
    }

    pub(crate) fn last_change_ms(&self) -> u64 {
        self.inner.lock().unwrap().last_change_ms
    }

    pub(crate) fn time_in_state(&self) -> Duration {
        let last = self.last_change_ms();
        Duration::from_millis(utils::curr_time_millis().saturating_sub(last))
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.current_state() == State::Closed
    }

    pub(crate) fn is_half_open(&self) -> bool {
        self.current_state() == State::HalfOpen
    }

    /// Applies the change iff `target` differs from the current state,
    /// stamps the change time and invokes the hook with (previous, target)
    /// before returning. Transitioning to the current state is a harmless
    /// no-op: no timestamp update, no hook.
    ///
    /// The hook runs with the machine lock held, so transitions are never
    /// interleaved; hooks must not call back into the machine.
    pub(crate) fn transition_to(&self, target: State) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == target {
            return;
        }
        let prev = inner.state;
        inner.state = target;
        inner.last_change_ms = utils::curr_time_millis();
        (self.hook)(prev, target);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn noop_machine() -> StateMachine {
        StateMachine::new(Box::new(|_, _| {}))
    }

    #[test]
    fn starts_closed() {
        let machine = noop_machine();
        assert_eq!(machine.current_state(), State::Closed);
        assert!(machine.is_closed());
    }

    #[test]
    fn transition_stamps_and_notifies() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook_seen = Arc::clone(&seen);
        let machine = StateMachine::new(Box::new(move |from, to| {
            hook_seen.lock().unwrap().push((from, to));
        }));
        let before = machine.last_change_ms();
        utils::sleep_for_ms(5);
        machine.transition_to(State::Open);
        assert_eq!(machine.current_state(), State::Open);
        assert!(machine.last_change_ms() > before);
        assert_eq!(*seen.lock().unwrap(), vec![(State::Closed, State::Open)]);
    }

    #[test]
    fn same_state_is_noop() {
        let fired = Arc::new(AtomicUsize::new(0));
        let hook_fired = Arc::clone(&fired);
        let machine = StateMachine::new(Box::new(move |_, _| {
            hook_fired.fetch_add(1, Ordering::SeqCst);
        }));
        machine.transition_to(State::Open);
        let stamped = machine.last_change_ms();
        utils::sleep_for_ms(5);
        machine.transition_to(State::Open);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(machine.last_change_ms(), stamped);
    }

    #[test]
    fn time_in_state_grows() {
        let machine = noop_machine();
        machine.transition_to(State::Open);
        utils::sleep_for_ms(20);
        assert!(machine.time_in_state() >= Duration::from_millis(10));
    }

    #[test]
    fn legal_transition_table() {
        let cases = vec![
            (State::Closed, State::Open, true),
            (State::Closed, State::HalfOpen, false),
            (State::Closed, State::Closed, false),
            (State::Open, State::HalfOpen, true),
            (State::Open, State::Closed, false),
            (State::Open, State::Open, false),
            (State::HalfOpen, State::Closed, true),
            (State::HalfOpen, State::Open, true),
            (State::HalfOpen, State::HalfOpen, false),
        ];
        for (from, to, expected) in cases {
            assert_eq!(State::is_valid_transition(from, to), expected);
        }
    }

    #[test]
    fn display() {
        assert_eq!(State::Closed.to_string(), "Closed");
        assert_eq!(State::Open.to_string(), "Open");
        assert_eq!(State::HalfOpen.to_string(), "HalfOpen");
    }
}
