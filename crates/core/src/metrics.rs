use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub events_received: u64,
    pub duplicates_skipped: u64,
    pub responses_sent: u64,
    pub takeover_suppressed: u64,
    pub task_failures: u64,
}

#[derive(Debug)]
pub struct MetricsStore {
    start_time: Instant,
    events_received: AtomicU64,
    duplicates_skipped: AtomicU64,
    responses_sent: AtomicU64,
    takeover_suppressed: AtomicU64,
    task_failures: AtomicU64,
}

impl MetricsStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            events_received: AtomicU64::new(0),
            duplicates_skipped: AtomicU64::new(0),
            responses_sent: AtomicU64::new(0),
            takeover_suppressed: AtomicU64::new(0),
            task_failures: AtomicU64::new(0),
        })
    }

    pub fn inc_events_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_duplicates_skipped(&self) {
        self.duplicates_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_responses_sent(&self) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_takeover_suppressed(&self) {
        self.takeover_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_task_failures(&self) {
        self.task_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            events_received: self.events_received.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            responses_sent: self.responses_sent.load(Ordering::Relaxed),
            takeover_suppressed: self.takeover_suppressed.load(Ordering::Relaxed),
            task_failures: self.task_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshot() {
        let metrics = MetricsStore::new();
        metrics.inc_events_received();
        metrics.inc_events_received();
        metrics.inc_duplicates_skipped();
        metrics.inc_responses_sent();
        metrics.inc_takeover_suppressed();
        metrics.inc_task_failures();

        let snap = metrics.snapshot();
        assert_eq!(snap.events_received, 2);
        assert_eq!(snap.duplicates_skipped, 1);
        assert_eq!(snap.responses_sent, 1);
        assert_eq!(snap.takeover_suppressed, 1);
        assert_eq!(snap.task_failures, 1);
    }
}
