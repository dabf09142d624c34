use super::state_machine::State;
use crate::Error;
use std::sync::RwLock;

/// Observer invoked when the breaker changes state, with (name, from, to).
pub type StateChangeCallback = Box<dyn Fn(&str, State, State) + Send + Sync>;
/// Observer invoked when the circuit trips; the error is the triggering
/// failure when one is known.
pub type TripCallback = Box<dyn Fn(&str, Option<&Error>) + Send + Sync>;
/// Observer invoked when the circuit resets back to Closed.
pub type ResetCallback = Box<dyn Fn(&str) + Send + Sync>;
/// Observer invoked on every successful call.
pub type SuccessCallback = Box<dyn Fn(&str) + Send + Sync>;
/// Observer invoked on every failed call, with the error.
pub type FailureCallback = Box<dyn Fn(&str, &Error) + Send + Sync>;
/// Observer invoked when a call is rejected because the circuit is Open.
pub type RejectionCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Per-instance observer registry. Observers run synchronously, in
/// registration order, on the thread that triggered the event; the engine
/// imposes no isolation between them.
#[derive(Default)]
pub(crate) struct Callbacks {
    on_state_change: RwLock<Vec<StateChangeCallback>>,
    on_trip: RwLock<Vec<TripCallback>>,
    on_reset: RwLock<Vec<ResetCallback>>,
    on_success: RwLock<Vec<SuccessCallback>>,
    on_failure: RwLock<Vec<FailureCallback>>,
    on_rejection: RwLock<Vec<RejectionCallback>>,
}

impl Callbacks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_on_state_change(&self, cb: StateChangeCallback) {
        self.on_state_change.write().unwrap().push(cb);
    }

    pub(crate) fn add_on_trip(&self, cb: TripCallback) {
        self.on_trip.write().unwrap().push(cb);
    }

    pub(crate) fn add_on_reset(&self, cb: ResetCallback) {
        self.on_reset.write().unwrap().push(cb);
    }

    pub(crate) fn add_on_success(&self, cb: SuccessCallback) {
        self.on_success.write().unwrap().push(cb);
    }

    pub(crate) fn add_on_failure(&self, cb: FailureCallback) {
        self.on_failure.write().unwrap().push(cb);
    }

    pub(crate) fn add_on_rejection(&self, cb: RejectionCallback) {
        self.on_rejection.write().unwrap().push(cb);
    }

    pub(crate) fn notify_state_change(&self, name: &str, from: State, to: State) {
        for cb in self.on_state_change.read().unwrap().iter() {
            cb(name, from, to);
        }
    }

    pub(crate) fn notify_trip(&self, name: &str, err: Option<&Error>) {
        for cb in self.on_trip.read().unwrap().iter() {
            cb(name, err);
        }
    }

    pub(crate) fn notify_reset(&self, name: &str) {
        for cb in self.on_reset.read().unwrap().iter() {
            cb(name);
        }
    }

    pub(crate) fn notify_success(&self, name: &str) {
        for cb in self.on_success.read().unwrap().iter() {
            cb(name);
        }
    }

    pub(crate) fn notify_failure(&self, name: &str, err: &Error) {
        for cb in self.on_failure.read().unwrap().iter() {
            cb(name, err);
        }
    }

    pub(crate) fn notify_rejection(&self, name: &str) {
        for cb in self.on_rejection.read().unwrap().iter() {
            cb(name);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn notifies_in_registration_order() {
        let callbacks = Callbacks::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"].iter() {
            let order = Arc::clone(&order);
            let tag = *tag;
            callbacks.add_on_reset(Box::new(move |_| {
                order.lock().unwrap().push(tag);
            }));
        }
        callbacks.notify_reset("default");
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn every_event_kind_reaches_its_observers() {
        let callbacks = Callbacks::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        callbacks.add_on_state_change(Box::new(move |name, from, to| {
            assert_eq!(name, "default");
            assert_eq!((from, to), (State::Closed, State::Open));
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let h = Arc::clone(&hits);
        callbacks.add_on_trip(Box::new(move |_, err| {
            assert!(err.is_some());
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let h = Arc::clone(&hits);
        callbacks.add_on_reset(Box::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let h = Arc::clone(&hits);
        callbacks.add_on_success(Box::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let h = Arc::clone(&hits);
        callbacks.add_on_failure(Box::new(move |_, err| {
            assert_eq!(err.to_string(), "boom");
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let h = Arc::clone(&hits);
        callbacks.add_on_rejection(Box::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        let err = anyhow!("boom");
        callbacks.notify_state_change("default", State::Closed, State::Open);
        callbacks.notify_trip("default", Some(&err));
        callbacks.notify_reset("default");
        callbacks.notify_success("default");
        callbacks.notify_failure("default", &err);
        callbacks.notify_rejection("default");
        assert_eq!(hits.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn no_observers_is_fine() {
        let callbacks = Callbacks::new();
        callbacks.notify_success("default");
        callbacks.notify_rejection("default");
    }
}
