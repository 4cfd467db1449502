//! Orchestrator: run lifecycle management
//!
//! The orchestrator owns startup and teardown:
//! - load the vocabulary (startup-fatal if empty or unreachable)
//! - bootstrap the session pool, tolerating per-slot failures
//! - spawn the worker fleet and the periodic stats reporter
//! - broadcast cancellation and join every worker
//! - emit the final stats snapshot
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = OrchestratorBuilder::new(config)
//!     .vocabulary(vocab)
//!     .build()
//!     .await?;
//!
//! let snapshot = orchestrator.run_until_shutdown().await?;
//! ```

mod builder;
mod executor;

pub use builder::OrchestratorBuilder;
pub use executor::Orchestrator;

#[cfg(test)]
mod tests;
