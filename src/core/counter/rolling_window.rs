use crate::core::config::{DEFAULT_WINDOW_BUCKET_COUNT, MIN_BUCKET_LEN_MS};
use crate::utils;
use std::cmp;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    requests: u64,
    failures: u64,
}

#[derive(Debug)]
struct WindowInner {
    buckets: Vec<Bucket>,
    // index of the bucket currently receiving counts
    head: usize,
    // anchor of the head bucket's time slot; advanced by whole bucket
    // lengths only, so the remainder carries over to the next rotation
    last_rotation_ms: u64,
    total_requests: u64,
    total_failures: u64,
}

/// Request/failure totals over a trailing time window, approximated by a
/// ring of fixed-size buckets. The head index advances exactly once per
/// elapsed bucket length, evicting the slot it moves into, so totals never
/// include activity older than the full window.
#[derive(Debug)]
pub(crate) struct RollingWindowCounter {
    inner: Mutex<WindowInner>,
    bucket_len_ms: u64,
    bucket_count: usize,
}

impl RollingWindowCounter {
    /// `bucket_count` of zero falls back to the default of 10; the bucket
    /// length never shrinks below one millisecond.
    pub(crate) fn new(window: Duration, bucket_count: u32) -> Self {
        let bucket_count = if bucket_count == 0 {
            DEFAULT_WINDOW_BUCKET_COUNT as usize
        } else {
            bucket_count as usize
        };
        let bucket_len_ms = cmp::max(
            window.as_millis() as u64 / bucket_count as u64,
            MIN_BUCKET_LEN_MS,
        );
        RollingWindowCounter {
            inner: Mutex::new(WindowInner {
                buckets: vec![Bucket::default(); bucket_count],
                head: 0,
                last_rotation_ms: utils::curr_time_millis(),
                total_requests: 0,
                total_failures: 0,
            }),
            bucket_len_ms,
            bucket_count,
        }
    }

    pub(crate) fn record_success(&self) {
        self.record_success_at(utils::curr_time_millis());
    }

    pub(crate) fn record_failure(&self) {
        self.record_failure_at(utils::curr_time_millis());
    }

    /// (total requests, total failures) covering the trailing window.
    pub(crate) fn counts(&self) -> (u64, u64) {
        self.counts_at(utils::curr_time_millis())
    }

    pub(crate) fn record_success_at(&self, now_ms: u64) {
        let mut inner = self.inner.lock().unwrap();
        self.rotate(&mut inner, now_ms);
        let head = inner.head;
        inner.buckets[head].requests += 1;
        inner.total_requests += 1;
    }

    pub(crate) fn record_failure_at(&self, now_ms: u64) {
        let mut inner = self.inner.lock().unwrap();
        self.rotate(&mut inner, now_ms);
        let head = inner.head;
        inner.buckets[head].requests += 1;
        inner.buckets[head].failures += 1;
        inner.total_requests += 1;
        inner.total_failures += 1;
    }

    pub(crate) fn counts_at(&self, now_ms: u64) -> (u64, u64) {
        let mut inner = self.inner.lock().unwrap();
        self.rotate(&mut inner, now_ms);
        (inner.total_requests, inner.total_failures)
    }

    pub(crate) fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        for bucket in inner.buckets.iter_mut() {
            *bucket = Bucket::default();
        }
        inner.head = 0;
        inner.last_rotation_ms = utils::curr_time_millis();
        inner.total_requests = 0;
        inner.total_failures = 0;
    }

    /// Advances the head by one slot per whole bucket length elapsed since
    /// the anchor, evicting each slot the head moves into. Evictions are
    /// capped at the ring size (after a full window of silence every bucket
    /// is zero), but the anchor always advances by the whole multiple so no
    /// drift accumulates.
    fn rotate(&self, inner: &mut WindowInner, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(inner.last_rotation_ms);
        let steps = elapsed / self.bucket_len_ms;
        if steps == 0 {
            return;
        }
        let evictions = cmp::min(steps, self.bucket_count as u64);
        for _ in 0..evictions {
            inner.head = (inner.head + 1) % self.bucket_count;
            let evicted = inner.buckets[inner.head];
            inner.total_requests -= evicted.requests;
            inner.total_failures -= evicted.failures;
            inner.buckets[inner.head] = Bucket::default();
        }
        inner.last_rotation_ms += steps * self.bucket_len_ms;
    }
}
