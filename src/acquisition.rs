//! Expected Utility Improvement (EUI) acquisition for one elicitation round.
//!
//! An [`AcquisitionEngine`] is built from the duel history of the current
//! round. Construction does all the expensive work:
//!
//! 1. **Dimensionality**: `F = width / 2`; anything but one feature per
//!    state stops here, before the GP engine is touched.
//! 2. **Normalize** the duels through the [`FeatureNormalizer`].
//! 3. **Train** the GP, receiving a model and its posterior hyperparameter
//!    samples.
//! 4. **Shared state**: the second half of the most recent duel.
//! 5. **Reachable states** from the shared state under the chosen policy.
//! 6. **Predict** posterior mean and variance at the training inputs and the
//!    reachable inputs, one row per posterior sample.
//!
//! [`AcquisitionEngine::eui`] then scores every reachable candidate. For
//! posterior sample `s` with best training utility `u*_s`, candidate `c`
//! with mean `μ` and variance `σ²` gets
//!
//! `EI = (μ − u*_s) Φ(z) + σ φ(z)`, with `z = (μ − u*_s) / σ`,
//!
//! and candidates are ranked by EI averaged over posterior samples, which
//! marginalizes hyperparameter uncertainty instead of trusting one point
//! estimate. The highest mean wins; ties go to the lowest candidate index.

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::history::{Duel, DuelHistory};
use crate::normal::{norm_cdf, norm_pdf};
use crate::normalize::FeatureNormalizer;
use crate::posterior::{PosteriorEngine, PosteriorSamples, PredictionMatrices};
use crate::reachable::{ReachableStateSet, ReachableStates};
use crate::storage::{IterationSnapshot, SNAPSHOT_VERSION, matrix_rows};
use crate::types::{FeatureDim, ModelId, ReachablePolicy};

/// Everything an [`AcquisitionEngine`] needs besides the history.
///
/// The configuration is opaque here: it is only handed on to the
/// collaborators.
pub struct RoundContext<'a, C, P: ?Sized> {
    /// Opaque configuration handle.
    pub config: &'a C,
    /// Maps raw duels into the GP input space.
    pub normalizer: &'a dyn FeatureNormalizer<C>,
    /// Trains the GP and predicts its posterior.
    pub posterior: &'a P,
    /// Enumerates candidate next states.
    pub reachable: &'a dyn ReachableStates<C>,
    /// Which GP model variant to train.
    pub model_id: ModelId,
    /// Which reachable-state enumeration to use.
    pub policy: ReachablePolicy,
}

/// The decision of one round.
#[derive(Clone, Debug, PartialEq)]
pub struct AcquisitionResult {
    /// The chosen candidate state.
    pub next_state: Vec<f64>,
    /// `concat(last shared state, next state)`.
    pub next_duel: Duel,
    /// Index of the chosen candidate in the reachable set.
    pub chosen_index: usize,
    /// EI averaged over posterior samples, one entry per reachable candidate.
    pub mean_exp_imp: Vec<f64>,
    /// `mean_exp_imp[chosen_index]`.
    pub max_exp_imp: f64,
}

/// Per-sample intermediate quantities of the EUI computation.
#[derive(Clone, Debug, PartialEq)]
pub struct ImprovementScores {
    /// Highest predicted training utility, one per posterior sample.
    pub best_so_far: Vec<f64>,
    /// EI per (posterior sample, candidate).
    pub per_sample: DMatrix<f64>,
    /// EI averaged over posterior samples, one per candidate.
    pub mean: Vec<f64>,
}

/// Inputs for human inspection of a round, kept apart from the decision so
/// that reporting can never change it.
#[derive(Debug)]
pub struct Diagnostics<'a> {
    /// Round index within the trial.
    pub iteration: usize,
    /// Trial the round belongs to.
    pub trial: usize,
    /// Duel history the engine was trained on.
    pub history: &'a DuelHistory,
    /// Posterior hyperparameter samples.
    pub samples: &'a PosteriorSamples,
    /// The four prediction matrices.
    pub predictions: &'a PredictionMatrices,
    /// The candidates that were scored.
    pub reachable: &'a ReachableStateSet,
    /// Per-sample EI scores.
    pub scores: ImprovementScores,
}

/// Closed-form expected improvement of a Gaussian `N(mean, variance)` over
/// `best_so_far`.
///
/// `variance` must be strictly positive; [`expected_improvement`] checks
/// this for whole matrices. The result is clamped at zero against round-off.
///
/// ```
/// use elicit::acquisition::improvement;
///
/// // At z = 0 only the uncertainty term remains: σ φ(0).
/// let ei = improvement(1.0, 1.0, 4.0);
/// assert!((ei - 2.0 * 0.398_942_280_401_432_7).abs() < 1e-12);
/// ```
#[must_use]
pub fn improvement(mean: f64, best_so_far: f64, variance: f64) -> f64 {
    let sigma = variance.sqrt();
    let diff = mean - best_so_far;
    let z = diff / sigma;
    (diff * norm_cdf(z) + sigma * norm_pdf(z)).max(0.0)
}

/// Score every candidate column of `predictions` under every posterior
/// sample row and average over samples.
///
/// # Errors
///
/// Returns [`Error::InvalidVariance`] for the first candidate variance that
/// is not finite and strictly positive, [`Error::ShapeMismatch`] when the
/// four matrices disagree on their shapes, and [`Error::Internal`] when there
/// are no posterior samples or no training columns to take a maximum over.
#[allow(clippy::cast_precision_loss)]
pub fn expected_improvement(predictions: &PredictionMatrices) -> Result<ImprovementScores> {
    let n_samples = predictions.n_samples();
    let n_candidates = predictions.n_candidates();
    if n_samples == 0 {
        return Err(Error::Internal("no posterior samples to average over"));
    }
    let n_train = predictions.train_mean.ncols();
    if n_train == 0 {
        return Err(Error::Internal("no training utilities to improve on"));
    }
    predictions.check_shape(n_samples, n_train, n_candidates)?;

    let best_so_far: Vec<f64> = predictions
        .train_mean
        .row_iter()
        .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        .collect();

    let mut per_sample = DMatrix::zeros(n_samples, n_candidates);
    for row in 0..n_samples {
        for col in 0..n_candidates {
            let variance = predictions.candidate_var[(row, col)];
            if !(variance > 0.0 && variance.is_finite()) {
                return Err(Error::InvalidVariance {
                    sample: row,
                    candidate: col,
                    variance,
                });
            }
            per_sample[(row, col)] = improvement(
                predictions.candidate_mean[(row, col)],
                best_so_far[row],
                variance,
            );
        }
    }

    let mean = per_sample
        .column_iter()
        .map(|col| col.sum() / n_samples as f64)
        .collect();

    Ok(ImprovementScores {
        best_so_far,
        per_sample,
        mean,
    })
}

/// Index of the largest value; ties resolve to the lowest index.
///
/// NaN entries never win. Returns `None` when no entry is comparable.
#[must_use]
pub fn argmax_first(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// A trained model and its predictions for one elicitation round.
///
/// Built fresh every round from the current history; never reused once the
/// history grows.
#[derive(Debug)]
pub struct AcquisitionEngine<M> {
    history: DuelHistory,
    dim: FeatureDim,
    model_id: ModelId,
    normalized: Vec<Vec<f64>>,
    model: M,
    samples: PosteriorSamples,
    last_shared_state: Vec<f64>,
    reachable: ReachableStateSet,
    predictions: PredictionMatrices,
}

impl<M> AcquisitionEngine<M> {
    /// Normalize, train, enumerate reachable states and predict.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyHistory`] without any duel.
    /// - [`Error::UnsupportedDimensionality`] for anything but one feature
    ///   per state; raised before the GP engine is called.
    /// - [`Error::ModelTraining`] / [`Error::UnknownModel`] from training.
    /// - [`Error::NoReachableStates`] when the candidate set is empty.
    /// - [`Error::ShapeMismatch`] when a collaborator returns inconsistent
    ///   shapes.
    pub fn new<C, P>(history: &DuelHistory, ctx: &RoundContext<'_, C, P>) -> Result<Self>
    where
        P: PosteriorEngine<C, Model = M> + ?Sized,
    {
        let dim = history.feature_dim()?;
        dim.require_one()?;

        let normalized = ctx.normalizer.normalize(history.duels(), dim, ctx.config)?;
        if normalized.len() != history.len() {
            return Err(Error::ShapeMismatch {
                matrix: "normalized duels",
                expected: (history.len(), dim.duel_width()),
                got: (normalized.len(), dim.duel_width()),
            });
        }

        let (model, samples) =
            ctx.posterior
                .train(&normalized, history.responses(), ctx.config, ctx.model_id)?;
        if samples.is_empty() {
            return Err(Error::ModelTraining(
                "training produced no posterior samples".to_string(),
            ));
        }

        let last_shared_state = history
            .last_shared_state()
            .ok_or(Error::EmptyHistory)?
            .to_vec();

        let reachable = ctx
            .reachable
            .enumerate(&last_shared_state, ctx.config, ctx.policy)?;
        if reachable.is_empty() {
            return Err(Error::NoReachableStates {
                shared_state: last_shared_state,
            });
        }

        let predictions =
            ctx.posterior
                .predict(&model, &samples, &normalized, reachable.normalized())?;
        predictions.check_shape(samples.len(), history.len(), reachable.len())?;

        trace_debug!(
            n_duels = history.len(),
            n_samples = samples.len(),
            n_reachable = reachable.len(),
            model = %ctx.model_id,
            "acquisition engine built"
        );

        Ok(Self {
            history: history.clone(),
            dim,
            model_id: ctx.model_id,
            normalized,
            model,
            samples,
            last_shared_state,
            reachable,
            predictions,
        })
    }

    /// Select the next duel by Expected Utility Improvement.
    ///
    /// Pure: nothing is written anywhere. The returned [`Diagnostics`]
    /// carry the intermediate quantities for reporting and persistence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVariance`] if a predicted candidate variance
    /// is not strictly positive.
    pub fn eui(
        &self,
        iteration: usize,
        trial: usize,
    ) -> Result<(AcquisitionResult, Diagnostics<'_>)> {
        let scores = expected_improvement(&self.predictions)?;
        let chosen_index = argmax_first(&scores.mean).ok_or_else(|| Error::NoReachableStates {
            shared_state: self.last_shared_state.clone(),
        })?;

        let next_state = self.reachable.raw()[chosen_index].clone();
        let next_duel = Duel::from_states(&self.last_shared_state, &next_state);
        let result = AcquisitionResult {
            next_state,
            next_duel,
            chosen_index,
            mean_exp_imp: scores.mean.clone(),
            max_exp_imp: scores.mean[chosen_index],
        };

        let diagnostics = Diagnostics {
            iteration,
            trial,
            history: &self.history,
            samples: &self.samples,
            predictions: &self.predictions,
            reachable: &self.reachable,
            scores,
        };
        Ok((result, diagnostics))
    }

    /// Pure exploration: every reachable candidate, unscored.
    ///
    /// A placeholder acquisition mode; it makes no selection.
    #[must_use]
    pub fn pure_exploration(&self) -> &[Vec<f64>] {
        self.reachable.raw()
    }

    /// The persisted record of a round decided by this engine.
    #[must_use]
    pub fn snapshot(
        &self,
        result: &AcquisitionResult,
        iteration: usize,
        trial: usize,
    ) -> IterationSnapshot {
        IterationSnapshot {
            version: SNAPSHOT_VERSION,
            trial,
            iter_num: iteration,
            model_id: self.model_id,
            mean_exp_imp: result.mean_exp_imp.clone(),
            max_exp_imp: result.max_exp_imp,
            chosen_index: result.chosen_index,
            next_duel: result.next_duel.clone(),
            samples: self.samples.clone(),
            x: self.history.rows(),
            y: self.history.responses().to_vec(),
            x_norm: self.normalized.clone(),
            mtrainmat: matrix_rows(&self.predictions.train_mean),
            vartrainmat: matrix_rows(&self.predictions.train_var),
            mreachmat: matrix_rows(&self.predictions.candidate_mean),
            varreachmat: matrix_rows(&self.predictions.candidate_var),
        }
    }

    /// The history this engine was trained on.
    #[must_use]
    pub fn history(&self) -> &DuelHistory {
        &self.history
    }

    /// Per-state dimensionality of the history.
    #[must_use]
    pub fn feature_dim(&self) -> FeatureDim {
        self.dim
    }

    /// The fitted model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Posterior hyperparameter samples of the fitted model.
    #[must_use]
    pub fn samples(&self) -> &PosteriorSamples {
        &self.samples
    }

    /// Second half of the most recent duel.
    #[must_use]
    pub fn last_shared_state(&self) -> &[f64] {
        &self.last_shared_state
    }

    /// Candidates reachable from the shared state.
    #[must_use]
    pub fn reachable(&self) -> &ReachableStateSet {
        &self.reachable
    }

    /// Posterior predictions at training and candidate inputs.
    #[must_use]
    pub fn predictions(&self) -> &PredictionMatrices {
        &self.predictions
    }
}
