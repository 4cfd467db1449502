//! Simulated client sessions
//!
//! Each session is one fake browser identity: a random token surfaced as a
//! cookie, a user agent fixed at mint time, and the seed length the server
//! prefers for it. The pool owns a fixed number of slots; workers take
//! snapshots of a slot's current handle and occasionally replace a handle
//! wholesale, so the fleet of identities churns over the run.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::headers;
use crate::target::TargetClient;

/// Length of session tokens
const TOKEN_LEN: usize = 16;

/// One simulated client identity
///
/// Handles are immutable once minted; rotation replaces the whole handle
/// rather than mutating it, so a snapshot taken by one worker stays valid
/// while another worker swaps the slot.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    token: String,
    user_agent: &'static str,
    created_at: DateTime<Utc>,
    seed_length: usize,
}

impl SessionHandle {
    /// Mint a fresh handle with a random token and user agent
    pub fn mint(rng: &mut impl Rng, seed_length: usize) -> Self {
        let token: String = rng
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();

        Self {
            token,
            user_agent: headers::random_user_agent(rng),
            created_at: Utc::now(),
            seed_length,
        }
    }

    /// Session token (sent as the session cookie)
    pub fn token(&self) -> &str {
        &self.token
    }

    /// User agent fixed at mint time
    pub fn user_agent(&self) -> &'static str {
        self.user_agent
    }

    /// When this handle was minted
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Seed length the server prefers for this session
    pub fn seed_length(&self) -> usize {
        self.seed_length
    }

    fn with_seed_length(mut self, seed_length: usize) -> Self {
        self.seed_length = seed_length;
        self
    }
}

/// Fixed-capacity pool of session slots
///
/// Capacity is constant for the process lifetime. Slots are independently
/// locked; there is no global pool lock, so a `pick` never waits on the
/// replacement of an unrelated slot.
pub struct SessionPool {
    slots: Vec<RwLock<Arc<SessionHandle>>>,
    length_classes: Vec<usize>,
}

impl SessionPool {
    /// Create a pool and bootstrap every slot against the target
    ///
    /// Bootstrap failures are non-fatal: the slot keeps its minted handle
    /// with a default length class drawn uniformly from `length_classes`.
    pub async fn bootstrap(
        capacity: usize,
        target: &dyn TargetClient,
        length_classes: Vec<usize>,
    ) -> Self {
        let mut rng = StdRng::from_entropy();
        let mut slots = Vec::with_capacity(capacity);

        for slot in 0..capacity {
            let handle = Self::mint_and_bootstrap(target, &length_classes, &mut rng).await;
            tracing::debug!(slot, token = handle.token(), "session slot initialized");
            slots.push(RwLock::new(Arc::new(handle)));
        }

        tracing::info!(capacity, "session pool ready");
        Self {
            slots,
            length_classes,
        }
    }

    async fn mint_and_bootstrap(
        target: &dyn TargetClient,
        length_classes: &[usize],
        rng: &mut StdRng,
    ) -> SessionHandle {
        let default_length = *length_classes
            .choose(rng)
            .expect("length classes validated non-empty");
        let handle = SessionHandle::mint(rng, default_length);

        match target.bootstrap(&handle).await {
            Ok(Some(preferred)) if length_classes.contains(&preferred) => {
                handle.with_seed_length(preferred)
            }
            Ok(Some(preferred)) => {
                tracing::debug!(
                    preferred,
                    "bootstrap suggested a length outside the configured classes, keeping default"
                );
                handle
            }
            Ok(None) => handle,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    token = handle.token(),
                    "session bootstrap failed, falling back to default length class"
                );
                handle
            }
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Select a slot uniformly at random and snapshot its current handle
    ///
    /// The snapshot stays usable even if the slot is replaced concurrently;
    /// it just stops representing the slot's current identity.
    pub fn pick(&self, rng: &mut impl Rng) -> (usize, Arc<SessionHandle>) {
        let slot = rng.gen_range(0..self.slots.len());
        let handle = self.slots[slot]
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        (slot, handle)
    }

    /// Mint a replacement handle for a slot and atomically swap it in
    ///
    /// The new handle is bootstrapped before the swap, so concurrent picks
    /// observe either the old handle or the fully constructed new one.
    pub async fn replace(&self, slot: usize, target: &dyn TargetClient) {
        let mut rng = StdRng::from_entropy();
        let handle = Self::mint_and_bootstrap(target, &self.length_classes, &mut rng).await;
        tracing::debug!(slot, token = handle.token(), "session rotated");

        let mut guard = self.slots[slot].write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(handle);
    }

    /// Age of the oldest live handle, for reporting
    pub fn oldest_session_age(&self) -> Option<Duration> {
        self.slots
            .iter()
            .map(|slot| {
                slot.read()
                    .unwrap_or_else(|e| e.into_inner())
                    .created_at()
            })
            .min()
            .and_then(|oldest| (Utc::now() - oldest).to_std().ok())
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("capacity", &self.slots.len())
            .field("length_classes", &self.length_classes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use crate::target::{SubmitOutcome, TargetError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedTarget {
        bootstrap_hint: Option<usize>,
        fail_bootstrap: bool,
        bootstraps: AtomicUsize,
    }

    impl ScriptedTarget {
        fn new(bootstrap_hint: Option<usize>, fail_bootstrap: bool) -> Self {
            Self {
                bootstrap_hint,
                fail_bootstrap,
                bootstraps: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TargetClient for ScriptedTarget {
        async fn submit(
            &self,
            _payload: &Payload,
            _session: &SessionHandle,
        ) -> Result<SubmitOutcome, TargetError> {
            Ok(SubmitOutcome::Accepted)
        }

        async fn bootstrap(
            &self,
            _session: &SessionHandle,
        ) -> Result<Option<usize>, TargetError> {
            self.bootstraps.fetch_add(1, Ordering::SeqCst);
            if self.fail_bootstrap {
                Err(TargetError::UnexpectedStatus(500))
            } else {
                Ok(self.bootstrap_hint)
            }
        }
    }

    #[test]
    fn test_mint_token_is_alphanumeric_and_fixed_length() {
        let mut rng = StdRng::seed_from_u64(1);
        let handle = SessionHandle::mint(&mut rng, 12);
        assert_eq!(handle.token().len(), TOKEN_LEN);
        assert!(handle.token().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_mint_tokens_differ() {
        let mut rng = StdRng::seed_from_u64(2);
        let a = SessionHandle::mint(&mut rng, 12);
        let b = SessionHandle::mint(&mut rng, 12);
        assert_ne!(a.token(), b.token());
    }

    #[tokio::test]
    async fn test_bootstrap_populates_all_slots() {
        let target = ScriptedTarget::new(None, false);
        let pool = SessionPool::bootstrap(4, &target, vec![12, 24]).await;

        assert_eq!(pool.capacity(), 4);
        assert_eq!(target.bootstraps.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_bootstrap_hint_sets_seed_length() {
        let target = ScriptedTarget::new(Some(24), false);
        let pool = SessionPool::bootstrap(3, &target, vec![12, 24]).await;

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            let (_, handle) = pool.pick(&mut rng);
            assert_eq!(handle.seed_length(), 24);
        }
    }

    #[tokio::test]
    async fn test_bootstrap_failure_falls_back_to_length_class() {
        let target = ScriptedTarget::new(None, true);
        let pool = SessionPool::bootstrap(3, &target, vec![12, 24]).await;

        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..10 {
            let (_, handle) = pool.pick(&mut rng);
            assert!([12, 24].contains(&handle.seed_length()));
        }
    }

    #[tokio::test]
    async fn test_hint_outside_classes_is_ignored() {
        let target = ScriptedTarget::new(Some(99), false);
        let pool = SessionPool::bootstrap(2, &target, vec![12, 24]).await;

        let mut rng = StdRng::seed_from_u64(5);
        let (_, handle) = pool.pick(&mut rng);
        assert!([12, 24].contains(&handle.seed_length()));
    }

    #[tokio::test]
    async fn test_replace_swaps_in_new_token() {
        let target = ScriptedTarget::new(None, false);
        let pool = SessionPool::bootstrap(1, &target, vec![12]).await;

        let mut rng = StdRng::seed_from_u64(6);
        let (slot, before) = pool.pick(&mut rng);
        pool.replace(slot, &target).await;
        let (_, after) = pool.pick(&mut rng);

        assert_ne!(before.token(), after.token());
        // The old snapshot is still a valid handle, just retired
        assert_eq!(before.token().len(), TOKEN_LEN);
    }

    #[tokio::test]
    async fn test_concurrent_pick_and_replace_never_tears() {
        let target = Arc::new(ScriptedTarget::new(None, false));
        let pool = Arc::new(SessionPool::bootstrap(2, target.as_ref(), vec![12]).await);

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            let target = Arc::clone(&target);
            tasks.push(tokio::spawn(async move {
                let mut rng = StdRng::from_entropy();
                for _ in 0..50 {
                    let (slot, handle) = pool.pick(&mut rng);
                    // Every observed handle is fully formed
                    assert_eq!(handle.token().len(), TOKEN_LEN);
                    assert_eq!(handle.seed_length(), 12);
                    if rng.gen_bool(0.2) {
                        pool.replace(slot, target.as_ref()).await;
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }
}
