#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Sequential Bayesian preference elicitation over pairwise duels.
//!
//! A person compares a *previous* state with a *current* state (a duel) and
//! says which one they prefer. From the duels answered so far, a Gaussian
//! process over a latent utility is trained, every state reachable from the
//! current one is scored by Expected Utility Improvement averaged over
//! posterior hyperparameter samples, and the best candidate becomes the next
//! duel. The reference setting is thermal comfort: states are operating
//! temperatures.
//!
//! # Getting Started
//!
//! ```
//! use elicit::prelude::*;
//!
//! let config = ElicitConfig::default()
//!     .with_gp_seed(11)
//!     .with_gp_samples(8, 20)
//!     .with_occupant(23.0, 5);
//! let elicitor = Elicitor::thermal(config).unwrap();
//!
//! let history = DuelHistory::from_rows(&[vec![20.0, 22.0]], &[1.0]).unwrap();
//! let outcome = elicitor.seq_learning(history, 2, 0);
//!
//! // One new duel per round, each starting where the previous one ended.
//! assert_eq!(outcome.history.len(), 3);
//! let duels = outcome.history.duels();
//! assert_eq!(duels[1].previous(), duels[0].current());
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`DuelHistory`](history::DuelHistory) | Append-only record of duels and their responses. |
//! | [`AcquisitionEngine`](acquisition::AcquisitionEngine) | Trains, predicts and scores one round. |
//! | [`Elicitor`] | Owns the collaborators and runs the round loop. |
//! | [`PosteriorEngine`](posterior::PosteriorEngine) | GP training and posterior prediction. |
//! | [`ReachableStates`](reachable::ReachableStates) | Candidate next states from the shared state. |
//! | [`ResponseGenerator`](simulator::ResponseGenerator) | Answers duels (a person or a synthetic occupant). |
//! | [`SnapshotStore`](storage::SnapshotStore) | Persists one snapshot per round. |
//! | [`DiagnosticsSink`](report::DiagnosticsSink) | Receives per-round diagnostics. |
//!
//! Only single-feature states are supported. Two-feature duel histories are
//! rejected with [`Error::UnsupportedDimensionality`] before any model is
//! trained.
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `async` | [`Elicitor::seq_learning_async`] on tokio's blocking pool | off |
//! | `journal` | [`JournalSnapshotStore`](storage::JournalSnapshotStore): JSONL snapshots with file locking | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at round boundaries | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
pub mod config;
mod elicitor;
mod error;
pub mod history;
mod normal;
pub mod normalize;
pub mod posterior;
pub mod reachable;
pub mod report;
mod rng_util;
pub mod simulator;
pub mod storage;
mod types;

pub use elicitor::{
    Cancellation, ElicitationOutcome, Elicitor, ElicitorBuilder, LoopStatus, NoHooks, Round,
    RoundHooks, RoundRecord,
};
pub use error::{Error, Result};
pub use types::{FeatureDim, ModelId, ReachablePolicy};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use elicit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquisition::{AcquisitionEngine, AcquisitionResult};
    pub use crate::config::{ElicitConfig, GpConfig, OccupantConfig};
    pub use crate::elicitor::{
        Cancellation, ElicitationOutcome, Elicitor, ElicitorBuilder, LoopStatus, NoHooks,
        RoundHooks, RoundRecord,
    };
    pub use crate::error::{Error, Result};
    pub use crate::history::{Duel, DuelHistory};
    pub use crate::normalize::{BoundsNormalizer, FeatureNormalizer};
    pub use crate::posterior::{PosteriorEngine, PosteriorSamples, PredictionMatrices, SampledGp};
    pub use crate::reachable::{GridReachability, ReachableStateSet, ReachableStates};
    pub use crate::report::{DiagnosticsSink, HtmlReportSink, NoopSink};
    pub use crate::simulator::{ResponseGenerator, SyntheticOccupant};
    #[cfg(feature = "journal")]
    pub use crate::storage::JournalSnapshotStore;
    pub use crate::storage::{
        DirectorySnapshotStore, IterationSnapshot, MemorySnapshotStore, SnapshotStore,
    };
    pub use crate::types::{FeatureDim, ModelId, ReachablePolicy};
}
