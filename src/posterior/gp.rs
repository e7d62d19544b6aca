//! Reference GP engine with sampled hyperparameters.
//!
//! Responses are standardized and regressed on the normalized duel inputs
//! with either a squared-exponential or a **Matérn 5/2** kernel (ARD
//! lengthscales). Instead of a single point estimate, the kernel
//! hyperparameters are drawn from their posterior with a random-walk
//! Metropolis chain on the log marginal likelihood under a log-normal prior.
//! Each kept draw yields its own GP posterior, which is what the acquisition
//! engine averages over.
//!
//! # Model ids
//!
//! | Id | Kernel |
//! |----|--------|
//! | 1 | Squared exponential |
//! | 2 | Matérn 5/2 |
//!
//! # Configuration
//!
//! Read from [`GpConfig`](crate::config::GpConfig): `n_samples`, `burn_in`,
//! `thin`, `proposal_scale`, `noise_variance` and `seed`.

use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector, Dyn};

use super::{PosteriorEngine, PosteriorSamples, PredictionMatrices};
use crate::config::ElicitConfig;
use crate::error::{Error, Result};
use crate::rng_util;
use crate::types::ModelId;

/// Prior mean of each log lengthscale (inputs live on `[0, 1]`).
const PRIOR_LOG_LENGTHSCALE: f64 = -1.2;
/// Prior standard deviation of every log hyperparameter.
const PRIOR_LOG_SD: f64 = 1.0;
/// Smallest predictive variance reported for any point.
const VARIANCE_FLOOR: f64 = 1e-12;
/// √5.
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Covariance function of the latent utility.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kernel {
    /// `k(r) = σ² exp(-r²/2)`.
    SquaredExponential,
    /// `k(r) = σ² (1 + √5 r + 5/3 r²) exp(-√5 r)`.
    Matern52,
}

impl Kernel {
    /// Select the kernel for a model id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownModel`] for ids other than 1 and 2.
    pub fn from_model_id(id: ModelId) -> Result<Self> {
        match id.0 {
            1 => Ok(Self::SquaredExponential),
            2 => Ok(Self::Matern52),
            other => Err(Error::UnknownModel(other)),
        }
    }

    /// Evaluate the kernel between two inputs.
    #[must_use]
    pub fn eval(self, x1: &[f64], x2: &[f64], lengthscales: &[f64], signal_var: f64) -> f64 {
        let mut r_sq = 0.0;
        for i in 0..x1.len() {
            let diff = (x1[i] - x2[i]) / lengthscales[i];
            r_sq += diff * diff;
        }
        match self {
            Self::SquaredExponential => signal_var * (-0.5 * r_sq).exp(),
            Self::Matern52 => {
                let sqrt5_r = SQRT_5 * r_sq.sqrt();
                signal_var * (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
            }
        }
    }
}

/// A GP fitted to one round of duels.
#[derive(Clone, Debug)]
pub struct SampledGpModel {
    kernel: Kernel,
    x_train: Vec<Vec<f64>>,
    /// Standardized responses.
    y_train: Vec<f64>,
    noise_variance: f64,
    acceptance_rate: f64,
}

impl SampledGpModel {
    /// The kernel selected by the model id.
    #[must_use]
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Fraction of Metropolis proposals that were accepted.
    #[must_use]
    pub fn acceptance_rate(&self) -> f64 {
        self.acceptance_rate
    }
}

/// Reference [`PosteriorEngine`] for [`ElicitConfig`].
///
/// # Examples
///
/// ```
/// use elicit::config::ElicitConfig;
/// use elicit::posterior::{PosteriorEngine, SampledGp};
/// use elicit::ModelId;
///
/// let config = ElicitConfig::default().with_gp_seed(7).with_gp_samples(20, 50);
/// let inputs = vec![vec![0.1, 0.3], vec![0.3, 0.5]];
/// let (model, samples) = SampledGp.train(&inputs, &[1.0, 0.0], &config, ModelId(2)).unwrap();
/// assert_eq!(samples.len(), 20);
///
/// let pred = SampledGp
///     .predict(&model, &samples, &inputs, &[vec![0.5, 0.6]])
///     .unwrap();
/// assert_eq!(pred.candidate_mean.shape(), (20, 1));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct SampledGp;

impl PosteriorEngine<ElicitConfig> for SampledGp {
    type Model = SampledGpModel;

    #[allow(clippy::cast_precision_loss)]
    fn train(
        &self,
        inputs: &[Vec<f64>],
        responses: &[f64],
        config: &ElicitConfig,
        model_id: ModelId,
    ) -> Result<(SampledGpModel, PosteriorSamples)> {
        let kernel = Kernel::from_model_id(model_id)?;
        if inputs.is_empty() {
            return Err(Error::ModelTraining("no training inputs".to_string()));
        }
        if inputs.len() != responses.len() {
            return Err(Error::ResponseCountMismatch {
                expected: inputs.len(),
                got: responses.len(),
            });
        }
        if responses.iter().any(|y| !y.is_finite()) {
            return Err(Error::ModelTraining("non-finite response".to_string()));
        }
        let d = inputs[0].len();
        if let Some(bad) = inputs.iter().find(|x| x.len() != d) {
            return Err(Error::DimensionMismatch {
                expected: d,
                got: bad.len(),
            });
        }

        let y_train = standardize(responses);
        let gp = &config.gp;
        let mut rng = gp.seed.map_or_else(fastrand::Rng::new, |s| {
            fastrand::Rng::with_seed(s ^ inputs.len() as u64)
        });

        let density = |theta: &[f64]| {
            log_marginal_likelihood(kernel, inputs, &y_train, theta, gp.noise_variance)
                .map(|lml| lml + log_prior(theta))
        };

        let mut theta = initial_theta(d);
        let mut current = density(&theta).ok_or_else(|| {
            Error::ModelTraining("kernel matrix is not positive definite".to_string())
        })?;

        let thin = gp.thin.max(1);
        let total = gp.burn_in + gp.n_samples * thin;
        let mut draws = Vec::with_capacity(gp.n_samples);
        let mut accepted = 0_usize;
        for step in 0..total {
            let proposal: Vec<f64> = theta
                .iter()
                .map(|t| t + gp.proposal_scale * rng_util::standard_normal(&mut rng))
                .collect();
            if let Some(lp) = density(&proposal) {
                if rng_util::f64_range(&mut rng, 0.0, 1.0).ln() < lp - current {
                    theta = proposal;
                    current = lp;
                    accepted += 1;
                }
            }
            if step >= gp.burn_in && (step - gp.burn_in + 1) % thin == 0 {
                draws.push(theta.clone());
            }
        }

        let acceptance_rate = accepted as f64 / total.max(1) as f64;
        trace_debug!(
            n_train = inputs.len(),
            n_samples = draws.len(),
            acceptance_rate,
            "hyperparameter chain finished"
        );

        let samples = PosteriorSamples::new(parameter_names(d), draws)?;
        let model = SampledGpModel {
            kernel,
            x_train: inputs.to_vec(),
            y_train,
            noise_variance: gp.noise_variance,
            acceptance_rate,
        };
        Ok((model, samples))
    }

    fn predict(
        &self,
        model: &SampledGpModel,
        samples: &PosteriorSamples,
        train_inputs: &[Vec<f64>],
        candidate_inputs: &[Vec<f64>],
    ) -> Result<PredictionMatrices> {
        let d = model.x_train.first().map_or(0, Vec::len);
        if let Some(bad) = train_inputs
            .iter()
            .chain(candidate_inputs)
            .find(|x| x.len() != d)
        {
            return Err(Error::DimensionMismatch {
                expected: d,
                got: bad.len(),
            });
        }

        let n_samples = samples.len();
        let mut out = PredictionMatrices {
            train_mean: DMatrix::zeros(n_samples, train_inputs.len()),
            train_var: DMatrix::zeros(n_samples, train_inputs.len()),
            candidate_mean: DMatrix::zeros(n_samples, candidate_inputs.len()),
            candidate_var: DMatrix::zeros(n_samples, candidate_inputs.len()),
        };

        for (row, theta) in samples.draws().iter().enumerate() {
            let posterior = FittedPosterior::new(model, theta).ok_or_else(|| {
                Error::ModelTraining(format!(
                    "kernel matrix is not positive definite for posterior sample {row}"
                ))
            })?;
            for (col, x) in train_inputs.iter().enumerate() {
                let (mean, var) = posterior.predict(x);
                out.train_mean[(row, col)] = mean;
                out.train_var[(row, col)] = var;
            }
            for (col, x) in candidate_inputs.iter().enumerate() {
                let (mean, var) = posterior.predict(x);
                out.candidate_mean[(row, col)] = mean;
                out.candidate_var[(row, col)] = var;
            }
        }

        Ok(out)
    }
}

/// The GP posterior for one hyperparameter draw.
struct FittedPosterior<'a> {
    model: &'a SampledGpModel,
    cholesky: Cholesky<f64, Dyn>,
    alpha: DVector<f64>,
    lengthscales: Vec<f64>,
    signal_var: f64,
}

impl<'a> FittedPosterior<'a> {
    fn new(model: &'a SampledGpModel, theta: &[f64]) -> Option<Self> {
        let (lengthscales, signal_var) = unpack(theta);
        let k = kernel_matrix(
            model.kernel,
            &model.x_train,
            &lengthscales,
            signal_var,
            model.noise_variance,
        );
        let cholesky = Cholesky::new(k)?;
        let alpha = cholesky.solve(&DVector::from_column_slice(&model.y_train));
        Some(Self {
            model,
            cholesky,
            alpha,
            lengthscales,
            signal_var,
        })
    }

    /// Latent mean and variance at one input.
    fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star = DVector::from_fn(self.model.x_train.len(), |i, _| {
            self.model
                .kernel
                .eval(x, &self.model.x_train[i], &self.lengthscales, self.signal_var)
        });
        let mean = k_star.dot(&self.alpha);
        let v = self.cholesky.solve(&k_star);
        let var = (self.signal_var - k_star.dot(&v)).max(VARIANCE_FLOOR);
        (mean, var)
    }
}

/// Zero-mean, unit-variance responses (unit scale when they do not vary).
#[allow(clippy::cast_precision_loss)]
fn standardize(y: &[f64]) -> Vec<f64> {
    let n = y.len();
    let mean = y.iter().sum::<f64>() / n as f64;
    let var = if n > 1 {
        y.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        1.0
    };
    let sd = var.sqrt().max(1e-10);
    y.iter().map(|&v| (v - mean) / sd).collect()
}

/// Build the kernel matrix `K + σ²I`.
fn kernel_matrix(
    kernel: Kernel,
    x: &[Vec<f64>],
    lengthscales: &[f64],
    signal_var: f64,
    noise_var: f64,
) -> DMatrix<f64> {
    let n = x.len();
    DMatrix::from_fn(n, n, |i, j| {
        let k = kernel.eval(&x[i], &x[j], lengthscales, signal_var);
        if i == j { k + noise_var } else { k }
    })
}

/// `log p(y | X, θ)` for a zero-mean GP, or `None` if `K + σ²I` is not
/// positive definite.
#[allow(clippy::cast_precision_loss)]
fn log_marginal_likelihood(
    kernel: Kernel,
    x: &[Vec<f64>],
    y: &[f64],
    theta: &[f64],
    noise_var: f64,
) -> Option<f64> {
    let (lengthscales, signal_var) = unpack(theta);
    let k = kernel_matrix(kernel, x, &lengthscales, signal_var, noise_var);
    let cholesky = Cholesky::new(k)?;
    let y = DVector::from_column_slice(y);
    let alpha = cholesky.solve(&y);
    let half_log_det: f64 = cholesky.l_dirty().diagonal().iter().map(|l| l.ln()).sum();
    let n = y.len() as f64;
    let lml = -0.5 * y.dot(&alpha) - half_log_det - 0.5 * n * (core::f64::consts::TAU).ln();
    lml.is_finite().then_some(lml)
}

/// Independent normal prior on every log hyperparameter.
fn log_prior(theta: &[f64]) -> f64 {
    let (signal, lengthscales) = theta.split_last().map_or((0.0, theta), |(s, l)| (*s, l));
    let z = |v: f64, mu: f64| (v - mu) / PRIOR_LOG_SD;
    let ls: f64 = lengthscales
        .iter()
        .map(|&l| -0.5 * z(l, PRIOR_LOG_LENGTHSCALE).powi(2))
        .sum();
    ls - 0.5 * z(signal, 0.0).powi(2)
}

fn initial_theta(d: usize) -> Vec<f64> {
    let mut theta = vec![PRIOR_LOG_LENGTHSCALE; d];
    theta.push(0.0);
    theta
}

/// Split `θ = [log ℓ₁ … log ℓ_d, log σ²]` into natural-scale values.
fn unpack(theta: &[f64]) -> (Vec<f64>, f64) {
    match theta.split_last() {
        Some((signal, lengthscales)) => (
            lengthscales.iter().map(|l| l.exp()).collect(),
            signal.exp(),
        ),
        None => (Vec::new(), 1.0),
    }
}

fn parameter_names(d: usize) -> Vec<String> {
    let mut names: Vec<String> = (0..d).map(|i| format!("log_lengthscale_{i}")).collect();
    names.push("log_signal_variance".to_string());
    names
}
