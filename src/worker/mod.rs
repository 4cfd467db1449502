//! Worker: the engine's execution unit
//!
//! Each worker is a tokio task running the same loop until cancellation:
//!
//! 1. Pick a session from the shared pool
//! 2. Build a randomized payload for it
//! 3. Send it through the retry-governed attempt loop
//! 4. Record exactly one outcome with the shared stats tracker
//! 5. Opportunistically rotate the session it used
//! 6. Sleep a jittered pacing interval
//!
//! Workers share the vocabulary, session pool, and stats tracker via `Arc`
//! and never block each other; cancellation is observed at every sleep
//! boundary so shutdown latency stays within one pacing interval.

mod builder;
mod executor;

pub use builder::WorkerBuilder;
pub use executor::{SequenceEnd, Worker, WorkerReport};
