//! The GP training and posterior-prediction contract.
//!
//! The acquisition engine consumes a latent-utility GP only through
//! [`PosteriorEngine`]: one call trains a model and returns posterior
//! hyperparameter samples, a second call predicts mean and variance at
//! training and candidate inputs for every sample. The samples are an explicit
//! value threaded from training into prediction; nothing is kept as ambient
//! state between the two calls.
//!
//! [`SampledGp`] is the reference engine.

mod gp;

pub use gp::{Kernel, SampledGp, SampledGpModel};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ModelId;

/// A finite, ordered collection of hyperparameter draws for one trained model.
///
/// Each draw is a flat vector of named parameters. Ordering carries no
/// meaning: downstream code only averages or maximizes over draws.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSamples {
    names: Vec<String>,
    draws: Vec<Vec<f64>>,
}

impl PosteriorSamples {
    /// Creates a sample set from parameter names and draws.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if a draw's length differs from
    /// the number of names.
    pub fn new(names: Vec<String>, draws: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = draws.iter().find(|d| d.len() != names.len()) {
            return Err(Error::DimensionMismatch {
                expected: names.len(),
                got: bad.len(),
            });
        }
        Ok(Self { names, draws })
    }

    /// Parameter names, one per column of a draw.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// All draws.
    #[must_use]
    pub fn draws(&self) -> &[Vec<f64>] {
        &self.draws
    }

    /// Number of draws.
    #[must_use]
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    /// Whether there are no draws.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Values of one named parameter across all draws, in draw order.
    #[must_use]
    pub fn trace(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.names.iter().position(|n| n == name)?;
        Some(self.draws.iter().map(|d| d[col]).collect())
    }
}

/// Posterior mean and variance of utility, one row per posterior sample.
///
/// Columns of the `train_*` matrices follow the duel history; columns of the
/// `candidate_*` matrices follow the reachable-state set.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionMatrices {
    /// Mean utility at the training inputs.
    pub train_mean: DMatrix<f64>,
    /// Utility variance at the training inputs.
    pub train_var: DMatrix<f64>,
    /// Mean utility at the candidate inputs.
    pub candidate_mean: DMatrix<f64>,
    /// Utility variance at the candidate inputs.
    pub candidate_var: DMatrix<f64>,
}

impl PredictionMatrices {
    /// Number of posterior samples (rows).
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.train_mean.nrows()
    }

    /// Number of candidate columns.
    #[must_use]
    pub fn n_candidates(&self) -> usize {
        self.candidate_mean.ncols()
    }

    /// Check every matrix against the expected shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] naming the first offending matrix.
    pub fn check_shape(&self, n_samples: usize, n_train: usize, n_candidates: usize) -> Result<()> {
        let checks = [
            ("train_mean", &self.train_mean, n_train),
            ("train_var", &self.train_var, n_train),
            ("candidate_mean", &self.candidate_mean, n_candidates),
            ("candidate_var", &self.candidate_var, n_candidates),
        ];
        for (matrix, m, cols) in checks {
            if m.shape() != (n_samples, cols) {
                return Err(Error::ShapeMismatch {
                    matrix,
                    expected: (n_samples, cols),
                    got: m.shape(),
                });
            }
        }
        Ok(())
    }
}

/// Trains a latent-utility GP and predicts its posterior.
///
/// `C` is the opaque configuration handle; the engine is the only party in
/// a round that interprets it for training.
pub trait PosteriorEngine<C>: Send + Sync {
    /// The fitted model handed back to [`predict`](Self::predict).
    type Model;

    /// Fit a model to normalized duels and their responses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelTraining`] when fitting fails and
    /// [`Error::UnknownModel`] when `model_id` selects no model.
    fn train(
        &self,
        inputs: &[Vec<f64>],
        responses: &[f64],
        config: &C,
        model_id: ModelId,
    ) -> Result<(Self::Model, PosteriorSamples)>;

    /// Predict utility mean and variance for every posterior sample at the
    /// training inputs and at the candidate inputs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelTraining`] when the posterior cannot be
    /// evaluated for a sample.
    fn predict(
        &self,
        model: &Self::Model,
        samples: &PosteriorSamples,
        train_inputs: &[Vec<f64>],
        candidate_inputs: &[Vec<f64>],
    ) -> Result<PredictionMatrices>;
}
