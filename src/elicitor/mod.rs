//! The elicitor: owns the collaborators and drives elicitation rounds.

use crate::acquisition::{AcquisitionEngine, AcquisitionResult, RoundContext};
use crate::config::ElicitConfig;
use crate::error::{Error, Result};
use crate::history::DuelHistory;
use crate::normalize::{BoundsNormalizer, FeatureNormalizer};
use crate::posterior::{PosteriorEngine, SampledGp};
use crate::reachable::{GridReachability, ReachableStates};
use crate::report::DiagnosticsSink;
use crate::simulator::{ResponseGenerator, SyntheticOccupant};
use crate::storage::SnapshotStore;
use crate::types::{ModelId, ReachablePolicy};

mod builder;
mod hooks;
mod sequential;

#[cfg(feature = "async")]
mod async_impl;

pub use builder::ElicitorBuilder;
pub use hooks::{Cancellation, NoHooks, RoundHooks};
pub use sequential::{ElicitationOutcome, LoopStatus, RoundRecord};

/// Runs sequential preference elicitation.
///
/// An elicitor bundles the opaque configuration `C`, the GP engine `P` and
/// the other collaborators of a round. The GP model variant and the
/// reachable-state policy are fixed for its lifetime.
///
/// # Examples
///
/// ```
/// use elicit::prelude::*;
///
/// let config = ElicitConfig::default()
///     .with_gp_seed(7)
///     .with_gp_samples(8, 20)
///     .with_occupant(23.0, 1);
/// let elicitor = Elicitor::thermal(config).unwrap();
///
/// let history = DuelHistory::from_rows(&[vec![20.0, 22.0]], &[1.0]).unwrap();
/// let outcome = elicitor.seq_learning(history, 2, 0);
///
/// assert!(outcome.status.is_completed());
/// assert_eq!(outcome.history.len(), 3);
/// ```
pub struct Elicitor<C = ElicitConfig, P = SampledGp> {
    pub(crate) config: C,
    pub(crate) posterior: P,
    pub(crate) normalizer: Box<dyn FeatureNormalizer<C>>,
    pub(crate) reachable: Box<dyn ReachableStates<C>>,
    pub(crate) responder: Box<dyn ResponseGenerator>,
    pub(crate) store: Box<dyn SnapshotStore>,
    pub(crate) diagnostics: Box<dyn DiagnosticsSink>,
    pub(crate) model_id: ModelId,
    pub(crate) policy: ReachablePolicy,
}

/// A decided round before the response is known.
#[derive(Debug)]
pub struct Round<M> {
    /// The engine that made the decision.
    pub engine: AcquisitionEngine<M>,
    /// The decision.
    pub result: AcquisitionResult,
    /// Why the snapshot could not be stored, if it could not.
    pub persistence_error: Option<Error>,
    /// Why the diagnostics sink failed, if it did.
    pub diagnostics_error: Option<Error>,
}

impl<C, P> Elicitor<C, P>
where
    P: PosteriorEngine<C>,
{
    /// Start building an elicitor around a configuration and a GP engine.
    pub fn builder(config: C, posterior: P) -> ElicitorBuilder<C, P> {
        ElicitorBuilder::new(config, posterior)
    }

    /// The configuration handed to every collaborator.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// The GP engine.
    pub fn posterior(&self) -> &P {
        &self.posterior
    }

    /// GP model variant trained every round.
    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    /// Reachable-state policy used every round.
    pub fn policy(&self) -> ReachablePolicy {
        self.policy
    }

    /// The snapshot store rounds are persisted to.
    pub fn store(&self) -> &dyn SnapshotStore {
        self.store.as_ref()
    }

    /// Borrow the collaborators as a round context.
    pub fn context(&self) -> RoundContext<'_, C, P> {
        RoundContext {
            config: &self.config,
            normalizer: self.normalizer.as_ref(),
            posterior: &self.posterior,
            reachable: self.reachable.as_ref(),
            model_id: self.model_id,
            policy: self.policy,
        }
    }

    /// Build an acquisition engine for the given history.
    ///
    /// # Errors
    ///
    /// See [`AcquisitionEngine::new`].
    pub fn engine(&self, history: &DuelHistory) -> Result<AcquisitionEngine<P::Model>> {
        AcquisitionEngine::new(history, &self.context())
    }

    /// Decide one round: build the engine, pick the next duel by EUI,
    /// persist the snapshot and report diagnostics.
    ///
    /// Storage and diagnostics failures are returned inside the [`Round`];
    /// they never change the decision.
    ///
    /// # Errors
    ///
    /// Returns any error from [`AcquisitionEngine::new`] or
    /// [`AcquisitionEngine::eui`]. Nothing is persisted in that case.
    pub fn acquire(
        &self,
        history: &DuelHistory,
        iteration: usize,
        trial: usize,
    ) -> Result<Round<P::Model>> {
        let engine = self.engine(history)?;
        let (result, diagnostics) = engine.eui(iteration, trial)?;

        let persistence_error = self
            .store
            .save(&engine.snapshot(&result, iteration, trial))
            .err();
        let diagnostics_error = self.diagnostics.report(&result, &diagnostics).err();

        #[cfg(feature = "tracing")]
        {
            if let Some(e) = &persistence_error {
                tracing::warn!(iteration, trial, error = %e, "snapshot not persisted");
            }
            if let Some(e) = &diagnostics_error {
                tracing::warn!(iteration, trial, error = %e, "diagnostics report failed");
            }
        }

        trace_info!(
            iteration,
            trial,
            chosen = result.chosen_index,
            max_exp_imp = result.max_exp_imp,
            "next duel selected"
        );

        Ok(Round {
            engine,
            result,
            persistence_error,
            diagnostics_error,
        })
    }
}

impl Elicitor<ElicitConfig, SampledGp> {
    /// An elicitor wired with the reference collaborators: bounds
    /// normalization, the sampled GP, grid reachability and a synthetic
    /// occupant answering duels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn thermal(config: ElicitConfig) -> Result<Self> {
        config.validate()?;
        let occupant = SyntheticOccupant::from_config(&config);
        Self::builder(config, SampledGp)
            .normalizer(BoundsNormalizer)
            .reachable(GridReachability)
            .responder(occupant)
            .build()
    }
}
