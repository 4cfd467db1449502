//! chaff: a concurrent decoy-submission engine
//!
//! chaff floods a single credential-harvesting endpoint with structurally
//! valid but semantically fake submissions, disguised as real browser
//! traffic, to dilute whatever the endpoint is collecting. The crate is
//! organized around one engine:
//!
//! - Payload generation from a shared vocabulary ([`payload`], [`vocab`])
//! - A rotating pool of fake client identities ([`session`], [`headers`])
//! - A retry-governed send loop per worker ([`worker`], [`retry`])
//! - Shared, injected outcome counters ([`stats`])
//! - Lifecycle management ([`orchestrator`])
//!
//! The target endpoint is reached through the [`target::TargetClient`]
//! trait, so everything above it is testable without a network.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod error;
pub mod headers;
pub mod orchestrator;
pub mod payload;
pub mod retry;
pub mod session;
pub mod stats;
pub mod target;
pub mod vocab;
pub mod worker;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use payload::{Payload, PayloadBuilder, SamplingMode};
pub use retry::{BackoffStrategy, RetryPolicy, Verdict};
pub use session::{SessionHandle, SessionPool};
pub use stats::{StatsSnapshot, StatsTracker};
pub use target::{HttpTarget, SubmitOutcome, TargetClient, TargetError};
pub use vocab::Vocabulary;
pub use worker::{Worker, WorkerBuilder};
