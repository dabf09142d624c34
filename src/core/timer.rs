use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// One-shot cancellable delayed task on a dedicated thread. The callback
/// runs after `delay` unless `cancel` wins the race; a cancelled task never
/// fires. Dropping the handle does not cancel.
pub(crate) struct DelayedTask {
    signal: Arc<(Mutex<bool>, Condvar)>,
}

impl DelayedTask {
    pub(crate) fn spawn<F>(delay: Duration, task: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_signal = Arc::clone(&signal);
        thread::spawn(move || {
            let (lock, cvar) = &*thread_signal;
            let cancelled = lock.lock().unwrap();
            let (cancelled, timeout) = cvar
                .wait_timeout_while(cancelled, delay, |cancelled| !*cancelled)
                .unwrap();
            let fire = timeout.timed_out() && !*cancelled;
            drop(cancelled);
            if fire {
                task();
            }
        });
        DelayedTask { signal }
    }

    pub(crate) fn cancel(&self) {
        let (lock, cvar) = &*self.signal;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let task_fired = Arc::clone(&fired);
        let _task = DelayedTask::spawn(Duration::from_millis(20), move || {
            task_fired.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        utils::sleep_for_ms(100);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let task_fired = Arc::clone(&fired);
        let task = DelayedTask::spawn(Duration::from_millis(50), move || {
            task_fired.fetch_add(1, Ordering::SeqCst);
        });
        task.cancel();
        utils::sleep_for_ms(120);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_after_firing_is_harmless() {
        let fired = Arc::new(AtomicUsize::new(0));
        let task_fired = Arc::clone(&fired);
        let task = DelayedTask::spawn(Duration::from_millis(10), move || {
            task_fired.fetch_add(1, Ordering::SeqCst);
        });
        utils::sleep_for_ms(60);
        task.cancel();
        task.cancel();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
