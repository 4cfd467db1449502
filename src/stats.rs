//! Shared outcome counters
//!
//! One tracker is created by the orchestrator and handed to every worker as
//! an `Arc`. Counters are lock-free atomics so concurrent `record_outcome`
//! calls never lose updates; snapshots are consistent enough for periodic
//! reporting without freezing the writers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Thread-safe counters for submission outcomes
#[derive(Debug)]
pub struct StatsTracker {
    sent: AtomicU64,
    succeeded: AtomicU64,
    errored: AtomicU64,
    started_at: Instant,
    started_wall: DateTime<Utc>,
    last_success: RwLock<Option<DateTime<Utc>>>,
}

impl StatsTracker {
    /// Create a tracker starting its clock now
    pub fn new() -> Self {
        Self {
            sent: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            errored: AtomicU64::new(0),
            started_at: Instant::now(),
            started_wall: Utc::now(),
            last_success: RwLock::new(None),
        }
    }

    /// Record the result of one completed attempt sequence
    ///
    /// Called exactly once per sequence by every worker, from any task.
    pub fn record_outcome(&self, success: bool) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
            let mut guard = self.last_success.write().unwrap_or_else(|e| e.into_inner());
            *guard = Some(Utc::now());
        } else {
            self.errored.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a snapshot for reporting
    ///
    /// Consistent for a quiesced tracker; under concurrent writers the
    /// counters may be a few updates apart, which is fine for reporting.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            errored: self.errored.load(Ordering::Relaxed),
            runtime: self.started_at.elapsed(),
            started_at: self.started_wall,
            last_success: *self
                .last_success
                .read()
                .unwrap_or_else(|e| e.into_inner()),
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    /// Completed attempt sequences
    pub sent: u64,
    /// Sequences that ended in an accepted submission
    pub succeeded: u64,
    /// Sequences that ended in failure
    pub errored: u64,
    /// Time since the tracker was created
    pub runtime: Duration,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Wall-clock time of the most recent success
    pub last_success: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    /// Success rate as a percentage; exactly 0.0 before anything was sent
    pub fn success_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.sent as f64) * 100.0
        }
    }

    /// Completed sequences per second over the whole run
    pub fn requests_per_second(&self) -> f64 {
        let secs = self.runtime.as_secs_f64();
        if secs > 0.0 {
            self.sent as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_snapshot_starts_empty() {
        let tracker = StatsTracker::new();
        let snap = tracker.snapshot();
        assert_eq!(snap.sent, 0);
        assert_eq!(snap.succeeded, 0);
        assert_eq!(snap.errored, 0);
        assert!(snap.last_success.is_none());
    }

    #[test]
    fn test_success_rate_zero_when_nothing_sent() {
        let tracker = StatsTracker::new();
        assert_eq!(tracker.snapshot().success_rate(), 0.0);
    }

    #[test]
    fn test_record_outcome_updates_counters() {
        let tracker = StatsTracker::new();
        tracker.record_outcome(true);
        tracker.record_outcome(true);
        tracker.record_outcome(false);

        let snap = tracker.snapshot();
        assert_eq!(snap.sent, 3);
        assert_eq!(snap.succeeded, 2);
        assert_eq!(snap.errored, 1);
        assert!(snap.last_success.is_some());
        assert!((snap.success_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_failures_do_not_touch_last_success() {
        let tracker = StatsTracker::new();
        tracker.record_outcome(false);
        assert!(tracker.snapshot().last_success.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_recording_loses_no_updates() {
        let tracker = Arc::new(StatsTracker::new());
        let mut tasks = Vec::new();

        // 8 tasks x 500 outcomes each, 3 in 5 successful
        for task_id in 0..8u64 {
            let tracker = Arc::clone(&tracker);
            tasks.push(tokio::spawn(async move {
                for i in 0..500u64 {
                    tracker.record_outcome((task_id + i) % 5 < 3);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snap = tracker.snapshot();
        assert_eq!(snap.sent, 4000);
        assert_eq!(snap.succeeded + snap.errored, 4000);
        assert_eq!(snap.succeeded, 2400);
        assert_eq!(snap.errored, 1600);
    }
}
