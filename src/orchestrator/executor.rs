//! Orchestrator execution logic

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::payload::PayloadBuilder;
use crate::session::SessionPool;
use crate::stats::{StatsSnapshot, StatsTracker};
use crate::target::TargetClient;
use crate::worker::WorkerBuilder;

/// Owns the run lifecycle: spawn, report, cancel, join
pub struct Orchestrator {
    pub(crate) config: EngineConfig,
    pub(crate) target: Arc<dyn TargetClient>,
    pub(crate) payloads: Arc<PayloadBuilder>,
    pub(crate) sessions: Arc<SessionPool>,
    pub(crate) stats: Arc<StatsTracker>,
    pub(crate) shutdown_tx: broadcast::Sender<()>,
    pub(crate) cancelled: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Get a shutdown signal receiver
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Trigger cancellation of all workers
    ///
    /// Latched: a shutdown issued before `run()` has spawned any worker is
    /// replayed once the workers have subscribed, so it is never lost.
    pub fn shutdown(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// The shared stats tracker
    pub fn stats(&self) -> &Arc<StatsTracker> {
        &self.stats
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Spawn the worker fleet and block until every worker has exited
    ///
    /// Workers only exit on cancellation, so callers pair this with either
    /// the Ctrl+C wrapper or an explicit `shutdown()` from another task.
    /// Returns the final stats snapshot.
    pub async fn run(&self) -> Result<StatsSnapshot> {
        tracing::info!(
            concurrency = self.config.concurrency,
            sessions = self.sessions.capacity(),
            endpoint = %self.config.endpoint,
            "starting submission engine"
        );

        let mut handles = Vec::with_capacity(self.config.concurrency);
        for worker_id in 0..self.config.concurrency {
            let worker = WorkerBuilder::new(worker_id)
                .target(Arc::clone(&self.target))
                .payloads(Arc::clone(&self.payloads))
                .sessions(Arc::clone(&self.sessions))
                .stats(Arc::clone(&self.stats))
                .retry(self.config.retry.clone())
                .rotate_probability(self.config.rotate_probability)
                .pacing(self.config.pacing_min, self.config.pacing_max)
                .build()?;

            let shutdown_rx = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(async move { worker.run(shutdown_rx).await }));
        }

        // Broadcast sends before any receiver exists are dropped, so a
        // cancellation latched earlier is re-broadcast now that every
        // worker holds a receiver.
        if self.cancelled.load(Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(());
        }

        let reporter = self.spawn_reporter();

        let mut worker_failures = 0;
        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(report) => {
                    tracing::debug!(
                        worker_id,
                        sequences = report.sequences,
                        successes = report.successes,
                        "worker joined"
                    );
                }
                Err(e) => {
                    worker_failures += 1;
                    tracing::error!(worker_id, error = %e, "worker task panicked");
                }
            }
        }
        reporter.abort();

        if worker_failures == self.config.concurrency {
            return Err(Error::Orchestration(format!(
                "all {worker_failures} workers failed"
            )));
        }

        let snapshot = self.stats.snapshot();
        tracing::info!(
            sent = snapshot.sent,
            succeeded = snapshot.succeeded,
            errored = snapshot.errored,
            success_rate = format!("{:.2}%", snapshot.success_rate()),
            runtime_secs = snapshot.runtime.as_secs_f64(),
            "run finished"
        );
        Ok(snapshot)
    }

    /// Run with Ctrl+C handling: graceful cancellation on the first signal
    pub async fn run_until_shutdown(&self) -> Result<StatsSnapshot> {
        let shutdown_tx = self.shutdown_tx.clone();
        let cancelled = Arc::clone(&self.cancelled);
        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("received Ctrl+C, cancelling workers");
                    cancelled.store(true, Ordering::SeqCst);
                    let _ = shutdown_tx.send(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to listen for Ctrl+C");
                }
            }
        });

        let result = self.run().await;
        signal_handle.abort();
        result
    }

    /// Run for a bounded duration, then cancel
    pub async fn run_for(&self, duration: Duration) -> Result<StatsSnapshot> {
        let shutdown_tx = self.shutdown_tx.clone();
        let cancelled = Arc::clone(&self.cancelled);
        let timeout_handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            tracing::info!(secs = duration.as_secs_f64(), "run duration reached, cancelling");
            cancelled.store(true, Ordering::SeqCst);
            let _ = shutdown_tx.send(());
        });

        let result = self.run().await;
        timeout_handle.abort();
        result
    }

    /// Periodic stats summary while the fleet runs
    fn spawn_reporter(&self) -> tokio::task::JoinHandle<()> {
        let stats = Arc::clone(&self.stats);
        let sessions = Arc::clone(&self.sessions);
        let interval = self.config.report_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // first tick fires immediately, skip it

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {
                        let snap = stats.snapshot();
                        tracing::info!(
                            sent = snap.sent,
                            succeeded = snap.succeeded,
                            errored = snap.errored,
                            success_rate = format!("{:.2}%", snap.success_rate()),
                            rps = format!("{:.2}", snap.requests_per_second()),
                            oldest_session_secs = sessions
                                .oldest_session_age()
                                .map(|age| age.as_secs()),
                            "progress"
                        );
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .finish()
    }
}
