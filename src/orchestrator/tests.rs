//! Integration tests for the orchestrator lifecycle

use super::*;
use crate::config::EngineConfig;
use crate::payload::{Payload, SamplingMode};
use crate::session::SessionHandle;
use crate::stats::StatsTracker;
use crate::target::{SubmitOutcome, TargetClient, TargetError};
use crate::vocab::Vocabulary;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Recording target
// ============================================================================

/// Accepts everything and keeps the payloads it saw
struct RecordingTarget {
    payloads: Mutex<Vec<Payload>>,
}

impl RecordingTarget {
    fn new() -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TargetClient for RecordingTarget {
    async fn submit(
        &self,
        payload: &Payload,
        _session: &SessionHandle,
    ) -> Result<SubmitOutcome, TargetError> {
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(SubmitOutcome::Accepted)
    }

    async fn bootstrap(&self, _session: &SessionHandle) -> Result<Option<usize>, TargetError> {
        Ok(None)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn test_config(concurrency: usize) -> EngineConfig {
    EngineConfig {
        endpoint: "https://example.test/api".into(),
        origin: "https://example.test".into(),
        concurrency,
        sessions: 2,
        length_classes: vec![12],
        sampling_mode: SamplingMode::Unique,
        pacing_min: Duration::from_millis(1),
        pacing_max: Duration::from_millis(3),
        report_interval: Duration::from_secs(60),
        ..Default::default()
    }
}

fn known_vocab() -> Arc<Vocabulary> {
    let words = (0..20).map(|i| format!("word{i:02}")).collect();
    Arc::new(Vocabulary::new(words).unwrap())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_build_requires_vocabulary() {
    let result = OrchestratorBuilder::new(test_config(1)).build().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let mut config = test_config(1);
    config.concurrency = 0;

    let result = OrchestratorBuilder::new(config)
        .vocabulary(known_vocab())
        .build()
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_single_worker_end_to_end() {
    let target = Arc::new(RecordingTarget::new());
    let stats = Arc::new(StatsTracker::new());

    let orchestrator = OrchestratorBuilder::new(test_config(1))
        .vocabulary(known_vocab())
        .target(Arc::clone(&target) as Arc<dyn TargetClient>)
        .stats(Arc::clone(&stats))
        .build()
        .await
        .unwrap();

    let shutdown_tx = orchestrator.shutdown_tx.clone();
    let waiter = {
        let stats = Arc::clone(&stats);
        tokio::spawn(async move {
            tokio::time::timeout(Duration::from_secs(5), async {
                while stats.snapshot().sent < 5 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("five sequences never completed");
            let _ = shutdown_tx.send(());
        })
    };

    let snapshot = orchestrator.run().await.unwrap();
    waiter.await.unwrap();

    assert!(snapshot.sent >= 5);
    assert_eq!(snapshot.succeeded, snapshot.sent);
    assert_eq!(snapshot.errored, 0);
    assert_eq!(snapshot.success_rate(), 100.0);

    // Every recorded payload: 12 distinct words, all from the known list
    let vocab = known_vocab();
    let allowed: HashSet<&str> = vocab.words().iter().map(String::as_str).collect();
    let payloads = target.payloads.lock().unwrap();
    assert!(payloads.len() >= 5);
    for payload in payloads.iter() {
        assert_eq!(payload.len(), 12);
        let distinct: HashSet<&str> = payload.words.iter().map(String::as_str).collect();
        assert_eq!(distinct.len(), 12);
        assert!(distinct.iter().all(|w| allowed.contains(w)));
    }
}

#[tokio::test]
async fn test_run_for_cancels_whole_fleet() {
    let target = Arc::new(RecordingTarget::new());

    let orchestrator = OrchestratorBuilder::new(test_config(4))
        .vocabulary(known_vocab())
        .target(target as Arc<dyn TargetClient>)
        .build()
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let snapshot = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.run_for(Duration::from_millis(200)),
    )
    .await
    .expect("fleet did not shut down in time")
    .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(snapshot.sent > 0);
    assert_eq!(snapshot.succeeded + snapshot.errored, snapshot.sent);
}

#[tokio::test]
async fn test_explicit_shutdown_joins_workers() {
    let target = Arc::new(RecordingTarget::new());
    let orchestrator = Arc::new(
        OrchestratorBuilder::new(test_config(3))
            .vocabulary(known_vocab())
            .target(target as Arc<dyn TargetClient>)
            .build()
            .await
            .unwrap(),
    );

    let runner = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.shutdown();

    let snapshot = tokio::time::timeout(Duration::from_secs(2), runner)
        .await
        .expect("shutdown did not complete")
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.succeeded + snapshot.errored, snapshot.sent);
}

#[tokio::test]
async fn test_shutdown_before_run_still_terminates() {
    let target = Arc::new(RecordingTarget::new());
    let orchestrator = OrchestratorBuilder::new(test_config(2))
        .vocabulary(known_vocab())
        .target(target as Arc<dyn TargetClient>)
        .build()
        .await
        .unwrap();

    // Cancellation issued before any worker has subscribed must still land
    orchestrator.shutdown();

    let snapshot = tokio::time::timeout(Duration::from_secs(2), orchestrator.run())
        .await
        .expect("run did not observe the earlier shutdown")
        .unwrap();
    assert_eq!(snapshot.succeeded + snapshot.errored, snapshot.sent);
}

#[tokio::test]
async fn test_shared_stats_are_injected_not_global() {
    // Two orchestrators never cross-contaminate counters
    let stats_a = Arc::new(StatsTracker::new());
    let stats_b = Arc::new(StatsTracker::new());

    for stats in [&stats_a, &stats_b] {
        let target = Arc::new(RecordingTarget::new());
        let orchestrator = OrchestratorBuilder::new(test_config(1))
            .vocabulary(known_vocab())
            .target(target as Arc<dyn TargetClient>)
            .stats(Arc::clone(stats))
            .build()
            .await
            .unwrap();
        orchestrator.run_for(Duration::from_millis(50)).await.unwrap();
    }

    assert!(stats_a.snapshot().sent > 0);
    assert!(stats_b.snapshot().sent > 0);
}
