use crate::error::{Error, Result};
use crate::normalize::FeatureNormalizer;
use crate::posterior::PosteriorEngine;
use crate::reachable::ReachableStates;
use crate::report::{DiagnosticsSink, NoopSink};
use crate::simulator::ResponseGenerator;
use crate::storage::{MemorySnapshotStore, SnapshotStore};
use crate::types::{ModelId, ReachablePolicy};

use super::Elicitor;

/// A builder for [`Elicitor`] instances.
///
/// Created via [`Elicitor::builder()`]. The normalizer, the reachable-state
/// enumerator and the response generator have no sensible default and must
/// be set.
///
/// # Defaults
///
/// - Model: [`ModelId::default()`] (Matérn 5/2 for the reference GP)
/// - Policy: [`ReachablePolicy::Grid1D`]
/// - Store: [`MemorySnapshotStore`]
/// - Diagnostics: [`NoopSink`]
///
/// # Examples
///
/// ```
/// use elicit::prelude::*;
/// use elicit::storage::MemorySnapshotStore;
///
/// let config = ElicitConfig::default();
/// let elicitor = Elicitor::builder(config, SampledGp)
///     .normalizer(BoundsNormalizer)
///     .reachable(GridReachability)
///     .responder(|duel: &Duel| if duel.current()[0] > duel.previous()[0] { 1.0 } else { 0.0 })
///     .policy(ReachablePolicy::Grid1D)
///     .model(ModelId(1))
///     .store(MemorySnapshotStore::new())
///     .build()
///     .unwrap();
///
/// assert_eq!(elicitor.model_id(), ModelId(1));
/// ```
pub struct ElicitorBuilder<C, P> {
    config: C,
    posterior: P,
    normalizer: Option<Box<dyn FeatureNormalizer<C>>>,
    reachable: Option<Box<dyn ReachableStates<C>>>,
    responder: Option<Box<dyn ResponseGenerator>>,
    store: Option<Box<dyn SnapshotStore>>,
    diagnostics: Option<Box<dyn DiagnosticsSink>>,
    model_id: ModelId,
    policy: ReachablePolicy,
}

impl<C, P> ElicitorBuilder<C, P>
where
    P: PosteriorEngine<C>,
{
    pub(super) fn new(config: C, posterior: P) -> Self {
        Self {
            config,
            posterior,
            normalizer: None,
            reachable: None,
            responder: None,
            store: None,
            diagnostics: None,
            model_id: ModelId::default(),
            policy: ReachablePolicy::default(),
        }
    }

    /// Set the feature normalizer.
    #[must_use]
    pub fn normalizer(mut self, normalizer: impl FeatureNormalizer<C> + 'static) -> Self {
        self.normalizer = Some(Box::new(normalizer));
        self
    }

    /// Set the reachable-state enumerator.
    #[must_use]
    pub fn reachable(mut self, reachable: impl ReachableStates<C> + 'static) -> Self {
        self.reachable = Some(Box::new(reachable));
        self
    }

    /// Set the source of duel responses.
    #[must_use]
    pub fn responder(mut self, responder: impl ResponseGenerator + 'static) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Set the snapshot store.
    #[must_use]
    pub fn store(mut self, store: impl SnapshotStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Set the diagnostics sink.
    #[must_use]
    pub fn diagnostics(mut self, sink: impl DiagnosticsSink + 'static) -> Self {
        self.diagnostics = Some(Box::new(sink));
        self
    }

    /// Select the GP model variant.
    #[must_use]
    pub fn model(mut self, model_id: ModelId) -> Self {
        self.model_id = model_id;
        self
    }

    /// Select the reachable-state policy.
    #[must_use]
    pub fn policy(mut self, policy: ReachablePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the elicitor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first required collaborator
    /// that was not set.
    pub fn build(self) -> Result<Elicitor<C, P>> {
        let normalizer = self
            .normalizer
            .ok_or_else(|| Error::Config("a feature normalizer is required".into()))?;
        let reachable = self
            .reachable
            .ok_or_else(|| Error::Config("a reachable-state enumerator is required".into()))?;
        let responder = self
            .responder
            .ok_or_else(|| Error::Config("a response generator is required".into()))?;

        Ok(Elicitor {
            config: self.config,
            posterior: self.posterior,
            normalizer,
            reachable,
            responder,
            store: self
                .store
                .unwrap_or_else(|| Box::new(MemorySnapshotStore::new())),
            diagnostics: self.diagnostics.unwrap_or_else(|| Box::new(NoopSink)),
            model_id: self.model_id,
            policy: self.policy,
        })
    }
}
