//! Deterministic collaborators for exercising the acquisition engine and
//! the round loop without a real GP.

use std::sync::atomic::{AtomicUsize, Ordering};

use elicit::acquisition::{AcquisitionResult, Diagnostics};
use elicit::history::Duel;
use elicit::normalize::FeatureNormalizer;
use elicit::posterior::{PosteriorEngine, PosteriorSamples, PredictionMatrices};
use elicit::reachable::{ReachableStateSet, ReachableStates};
use elicit::report::DiagnosticsSink;
use elicit::simulator::ResponseGenerator;
use elicit::storage::{IterationSnapshot, SnapshotStore};
use elicit::{Error, FeatureDim, ModelId, ReachablePolicy, Result};
use nalgebra::DMatrix;

/// Passes raw features straight through.
pub struct Identity;

impl FeatureNormalizer<()> for Identity {
    fn normalize(&self, duels: &[Duel], _dim: FeatureDim, _config: &()) -> Result<Vec<Vec<f64>>> {
        Ok(duels.iter().map(|d| d.features().to_vec()).collect())
    }
}

/// Utility as a function of the current state of a duel input.
pub type Utility = fn(f64) -> f64;

/// A posterior whose mean at input `[prev, cur]` is `utility(cur)` plus a
/// small per-sample offset, with constant variance.
pub struct FakePosterior {
    pub n_samples: usize,
    pub utility: Utility,
    pub variance: f64,
    pub train_calls: AtomicUsize,
}

impl FakePosterior {
    pub fn new(utility: Utility) -> Self {
        Self {
            n_samples: 4,
            utility,
            variance: 0.25,
            train_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_variance(mut self, variance: f64) -> Self {
        self.variance = variance;
        self
    }

    pub fn calls(&self) -> usize {
        self.train_calls.load(Ordering::SeqCst)
    }
}

/// Peaked at 23.
pub fn peaked(state: f64) -> f64 {
    -(state - 23.0).powi(2)
}

pub fn flat(_state: f64) -> f64 {
    0.0
}

impl PosteriorEngine<()> for FakePosterior {
    type Model = usize;

    fn train(
        &self,
        inputs: &[Vec<f64>],
        responses: &[f64],
        _config: &(),
        _model_id: ModelId,
    ) -> Result<(usize, PosteriorSamples)> {
        self.train_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(inputs.len(), responses.len());
        let draws = (0..self.n_samples).map(|i| vec![i as f64]).collect();
        Ok((inputs.len(), PosteriorSamples::new(vec!["theta".into()], draws)?))
    }

    fn predict(
        &self,
        model: &usize,
        samples: &PosteriorSamples,
        train_inputs: &[Vec<f64>],
        candidate_inputs: &[Vec<f64>],
    ) -> Result<PredictionMatrices> {
        assert_eq!(*model, train_inputs.len());
        let rows = samples.len();
        let mean = |inputs: &[Vec<f64>]| {
            DMatrix::from_fn(rows, inputs.len(), |r, c| {
                (self.utility)(inputs[c][1]) + 0.01 * r as f64
            })
        };
        Ok(PredictionMatrices {
            train_mean: mean(train_inputs),
            train_var: DMatrix::from_element(rows, train_inputs.len(), self.variance),
            candidate_mean: mean(candidate_inputs),
            candidate_var: DMatrix::from_element(rows, candidate_inputs.len(), self.variance),
        })
    }
}

/// Candidates at fixed offsets from the shared state.
pub struct Offsets(pub Vec<f64>);

impl ReachableStates<()> for Offsets {
    fn enumerate(
        &self,
        shared_state: &[f64],
        _config: &(),
        _policy: ReachablePolicy,
    ) -> Result<ReachableStateSet> {
        let shared = shared_state[0];
        let raw: Vec<Vec<f64>> = self.0.iter().map(|o| vec![shared + o]).collect();
        let normalized = raw.iter().map(|c| vec![shared, c[0]]).collect();
        ReachableStateSet::new(raw, normalized)
    }
}

pub fn offsets() -> Offsets {
    Offsets(vec![-2.0, -1.0, 0.0, 1.0, 2.0])
}

/// Prefers the current state whenever it moved towards 23.
pub fn towards_23(duel: &Duel) -> f64 {
    let before = (duel.previous()[0] - 23.0).abs();
    let after = (duel.current()[0] - 23.0).abs();
    if after < before { 1.0 } else { 0.0 }
}

/// Answers every duel twice.
pub struct Chatty;

impl ResponseGenerator for Chatty {
    fn respond(&self, duels: &[Duel]) -> Result<Vec<f64>> {
        Ok(duels.iter().flat_map(|_| [1.0, 0.0]).collect())
    }
}

pub struct BrokenStore;

impl SnapshotStore for BrokenStore {
    fn save(&self, _snapshot: &IterationSnapshot) -> Result<()> {
        Err(Error::Persistence("disk full".into()))
    }

    fn load(&self, _trial: usize, _iteration: usize) -> Result<Option<IterationSnapshot>> {
        Ok(None)
    }

    fn iterations(&self, _trial: usize) -> Result<Vec<usize>> {
        Ok(Vec::new())
    }
}

pub struct BrokenSink;

impl DiagnosticsSink for BrokenSink {
    fn report(&self, _result: &AcquisitionResult, _diagnostics: &Diagnostics<'_>) -> Result<()> {
        Err(Error::Diagnostics("renderer unavailable".into()))
    }
}
