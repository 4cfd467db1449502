//! Worker execution loop

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::payload::PayloadBuilder;
use crate::retry::{RetryPolicy, Verdict};
use crate::session::SessionPool;
use crate::stats::StatsTracker;
use crate::target::{SubmitOutcome, TargetClient};

/// Terminal state of one attempt sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEnd {
    /// The target accepted the submission
    Success {
        /// Attempts used, including the accepted one
        attempts: u32,
    },
    /// The sequence exhausted its budget or hit a terminal rejection
    Failure {
        /// Attempts used
        attempts: u32,
    },
    /// Cancellation arrived during a backoff sleep
    Cancelled {
        /// Attempts completed before cancellation
        attempts: u32,
    },
}

/// What a worker did over its lifetime, for the shutdown log
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerReport {
    /// Completed attempt sequences
    pub sequences: u64,
    /// Sequences that ended in success
    pub successes: u64,
}

/// The execution unit: one send-loop over shared collaborators
pub struct Worker {
    pub(super) id: usize,
    pub(super) target: Arc<dyn TargetClient>,
    pub(super) payloads: Arc<PayloadBuilder>,
    pub(super) sessions: Arc<SessionPool>,
    pub(super) stats: Arc<StatsTracker>,
    pub(super) retry: RetryPolicy,
    pub(super) rotate_probability: f64,
    pub(super) pacing_min: Duration,
    pub(super) pacing_max: Duration,
    pub(super) rng: StdRng,
}

impl Worker {
    /// Run the send loop until cancellation is observed
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> WorkerReport {
        let mut report = WorkerReport::default();
        tracing::debug!(worker_id = self.id, "worker started");

        loop {
            // Anything other than an empty channel means shutdown: a signal,
            // a lagged signal, or a dropped orchestrator.
            if !matches!(shutdown.try_recv(), Err(TryRecvError::Empty)) {
                break;
            }

            let (slot, session) = self.sessions.pick(&mut self.rng);
            let payload = match self.payloads.build_for_session(&session, &mut self.rng) {
                Ok(payload) => payload,
                Err(e) => {
                    // Unreachable after startup validation, but a worker
                    // never dies over a single bad iteration.
                    tracing::warn!(worker_id = self.id, error = %e, "payload build failed");
                    self.stats.record_outcome(false);
                    report.sequences += 1;
                    self.pacing_sleep(&mut shutdown).await;
                    continue;
                }
            };

            match self.send_with_retry(&payload, &session, &mut shutdown).await {
                SequenceEnd::Success { attempts } => {
                    tracing::debug!(
                        worker_id = self.id,
                        attempts,
                        words = payload.len(),
                        "submission accepted"
                    );
                    self.stats.record_outcome(true);
                    report.sequences += 1;
                    report.successes += 1;
                }
                SequenceEnd::Failure { attempts } => {
                    tracing::debug!(worker_id = self.id, attempts, "submission failed");
                    self.stats.record_outcome(false);
                    report.sequences += 1;
                }
                SequenceEnd::Cancelled { attempts } => {
                    tracing::info!(
                        worker_id = self.id,
                        attempts,
                        "shutdown interrupted an attempt sequence"
                    );
                    break;
                }
            }

            if self.rng.gen_bool(self.rotate_probability) {
                self.sessions.replace(slot, self.target.as_ref()).await;
            }

            if !self.pacing_sleep(&mut shutdown).await {
                break;
            }
        }

        tracing::debug!(
            worker_id = self.id,
            sequences = report.sequences,
            successes = report.successes,
            "worker finished"
        );
        report
    }

    /// Run one attempt sequence through the retry policy
    ///
    /// In-flight requests are allowed to finish (they are bounded by the
    /// request timeout); cancellation is taken at the backoff sleeps.
    async fn send_with_retry(
        &mut self,
        payload: &crate::payload::Payload,
        session: &crate::session::SessionHandle,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> SequenceEnd {
        let mut attempt = 1u32;
        loop {
            let result = self.target.submit(payload, session).await;
            self.log_attempt(attempt, &result);

            match self.retry.assess(attempt, &result) {
                Verdict::Success => return SequenceEnd::Success { attempts: attempt },
                Verdict::Failure => return SequenceEnd::Failure { attempts: attempt },
                Verdict::Retry => {
                    let delay = self.retry.delay_for_attempt(attempt, &mut self.rng);
                    tracing::debug!(
                        worker_id = self.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "backing off before retry"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => {
                            return SequenceEnd::Cancelled { attempts: attempt };
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn log_attempt(&self, attempt: u32, result: &Result<SubmitOutcome, crate::target::TargetError>) {
        match result {
            Ok(SubmitOutcome::Accepted) => {}
            Ok(SubmitOutcome::Blocked) => {
                tracing::debug!(worker_id = self.id, attempt, "request blocked")
            }
            Ok(SubmitOutcome::Rejected(status)) => {
                tracing::debug!(worker_id = self.id, attempt, status, "request rejected")
            }
            Err(e) => {
                tracing::debug!(worker_id = self.id, attempt, error = %e, "transport failure")
            }
        }
    }

    /// Jittered pacing sleep; returns false when shutdown arrived during it
    async fn pacing_sleep(&mut self, shutdown: &mut broadcast::Receiver<()>) -> bool {
        let pace = if self.pacing_max > self.pacing_min {
            let range = (self.pacing_max - self.pacing_min).as_nanos() as u64;
            self.pacing_min + Duration::from_nanos(self.rng.gen_range(0..=range))
        } else {
            self.pacing_min
        };

        tokio::select! {
            biased;
            _ = shutdown.recv() => false,
            _ = tokio::time::sleep(pace) => true,
        }
    }

    /// Worker identifier
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("retry", &self.retry)
            .field("rotate_probability", &self.rotate_probability)
            .field("pacing_min", &self.pacing_min)
            .field("pacing_max", &self.pacing_max)
            .finish()
    }
}
