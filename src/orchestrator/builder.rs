//! Builder pattern for Orchestrator construction

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::payload::PayloadBuilder;
use crate::session::SessionPool;
use crate::stats::StatsTracker;
use crate::target::{HttpTarget, TargetClient};
use crate::vocab::Vocabulary;

use super::executor::Orchestrator;

/// Builder wiring config, vocabulary, and target into an [`Orchestrator`]
///
/// `build` is async because it bootstraps the session pool against the
/// target before any worker exists.
pub struct OrchestratorBuilder {
    config: EngineConfig,
    vocab: Option<Arc<Vocabulary>>,
    target: Option<Arc<dyn TargetClient>>,
    stats: Option<Arc<StatsTracker>>,
}

impl OrchestratorBuilder {
    /// Create a builder for the given configuration
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            vocab: None,
            target: None,
            stats: None,
        }
    }

    /// Set the loaded vocabulary (required)
    pub fn vocabulary(mut self, vocab: Arc<Vocabulary>) -> Self {
        self.vocab = Some(vocab);
        self
    }

    /// Override the target client (tests); defaults to [`HttpTarget`]
    pub fn target(mut self, target: Arc<dyn TargetClient>) -> Self {
        self.target = Some(target);
        self
    }

    /// Share an externally owned stats tracker
    pub fn stats(mut self, stats: Arc<StatsTracker>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Validate, bootstrap the session pool, and build the orchestrator
    pub async fn build(self) -> Result<Orchestrator> {
        self.config.validate()?;

        let vocab = self
            .vocab
            .ok_or_else(|| Error::Orchestration("no vocabulary provided".into()))?;

        let target: Arc<dyn TargetClient> = match self.target {
            Some(target) => target,
            None => {
                let client = reqwest::Client::builder()
                    .danger_accept_invalid_certs(true)
                    .build()?;
                Arc::new(HttpTarget::new(
                    client,
                    self.config.endpoint.clone(),
                    self.config.origin.clone(),
                    self.config.blocked_status,
                    self.config.bootstrap_code,
                    self.config.request_timeout,
                ))
            }
        };

        let payloads = Arc::new(
            PayloadBuilder::new(
                Arc::clone(&vocab),
                self.config.length_classes.clone(),
                &self.config.type_weights,
                self.config.sampling_mode,
            )
            .map_err(|e| Error::Orchestration(e.to_string()))?,
        );

        let sessions = Arc::new(
            SessionPool::bootstrap(
                self.config.sessions,
                target.as_ref(),
                self.config.length_classes.clone(),
            )
            .await,
        );

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Orchestrator {
            config: self.config,
            target,
            payloads,
            sessions,
            stats: self.stats.unwrap_or_default(),
            shutdown_tx,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl std::fmt::Debug for OrchestratorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorBuilder")
            .field("config", &self.config)
            .field("has_vocab", &self.vocab.is_some())
            .field("has_target", &self.target.is_some())
            .finish()
    }
}
