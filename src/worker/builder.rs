//! Builder pattern for Worker construction

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::payload::PayloadBuilder;
use crate::retry::RetryPolicy;
use crate::session::SessionPool;
use crate::stats::StatsTracker;
use crate::target::TargetClient;

use super::executor::Worker;

/// Builder for [`Worker`] instances
///
/// All collaborators are required; `build` fails on missing wiring rather
/// than panicking at run time.
pub struct WorkerBuilder {
    id: usize,
    target: Option<Arc<dyn TargetClient>>,
    payloads: Option<Arc<PayloadBuilder>>,
    sessions: Option<Arc<SessionPool>>,
    stats: Option<Arc<StatsTracker>>,
    retry: RetryPolicy,
    rotate_probability: f64,
    pacing_min: Duration,
    pacing_max: Duration,
    rng: Option<StdRng>,
}

impl WorkerBuilder {
    /// Create a builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            target: None,
            payloads: None,
            sessions: None,
            stats: None,
            retry: RetryPolicy::default(),
            rotate_probability: 0.1,
            pacing_min: Duration::from_millis(200),
            pacing_max: Duration::from_millis(500),
            rng: None,
        }
    }

    /// Set the target client
    pub fn target(mut self, target: Arc<dyn TargetClient>) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the payload builder
    pub fn payloads(mut self, payloads: Arc<PayloadBuilder>) -> Self {
        self.payloads = Some(payloads);
        self
    }

    /// Set the session pool
    pub fn sessions(mut self, sessions: Arc<SessionPool>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Set the shared stats tracker
    pub fn stats(mut self, stats: Arc<StatsTracker>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the session rotation probability
    pub fn rotate_probability(mut self, p: f64) -> Self {
        self.rotate_probability = p;
        self
    }

    /// Set the pacing window
    pub fn pacing(mut self, min: Duration, max: Duration) -> Self {
        self.pacing_min = min;
        self.pacing_max = max;
        self
    }

    /// Inject a seeded rng (tests); production defaults to entropy seeding
    pub fn rng(mut self, rng: StdRng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Build the worker
    pub fn build(self) -> Result<Worker> {
        let target = self.target.ok_or_else(|| Error::missing_field("target"))?;
        let payloads = self
            .payloads
            .ok_or_else(|| Error::missing_field("payloads"))?;
        let sessions = self
            .sessions
            .ok_or_else(|| Error::missing_field("sessions"))?;
        let stats = self.stats.ok_or_else(|| Error::missing_field("stats"))?;

        Ok(Worker {
            id: self.id,
            target,
            payloads,
            sessions,
            stats,
            retry: self.retry,
            rotate_probability: self.rotate_probability,
            pacing_min: self.pacing_min,
            pacing_max: self.pacing_max,
            rng: self.rng.unwrap_or_else(StdRng::from_entropy),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_missing_target() {
        let result = WorkerBuilder::new(0).build();
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("target"));
    }

    #[test]
    fn test_builder_missing_stats() {
        use crate::payload::{PayloadBuilder, SamplingMode};
        use crate::vocab::Vocabulary;

        let vocab = Arc::new(
            Vocabulary::new((0..20).map(|i| format!("w{i}")).collect()).unwrap(),
        );
        let payloads = Arc::new(
            PayloadBuilder::new(vocab, vec![12], &[(2, 1.0)], SamplingMode::Unique).unwrap(),
        );

        let result = WorkerBuilder::new(0).payloads(payloads).build();
        assert!(result.is_err());
    }
}
