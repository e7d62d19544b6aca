//! Enumerating the next states reachable from the shared state.

use crate::config::ElicitConfig;
use crate::error::{Error, Result};
use crate::history::Duel;
use crate::normalize::BoundsNormalizer;
use crate::types::{FeatureDim, ReachablePolicy};

/// Candidate next states in raw form, with the normalized duel inputs
/// `concat(shared, candidate)` the GP is evaluated at.
#[derive(Clone, Debug, PartialEq)]
pub struct ReachableStateSet {
    raw: Vec<Vec<f64>>,
    normalized: Vec<Vec<f64>>,
}

impl ReachableStateSet {
    /// Creates a set from raw candidates and their normalized duel inputs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the two lists differ in length.
    pub fn new(raw: Vec<Vec<f64>>, normalized: Vec<Vec<f64>>) -> Result<Self> {
        if raw.len() != normalized.len() {
            return Err(Error::DimensionMismatch {
                expected: raw.len(),
                got: normalized.len(),
            });
        }
        Ok(Self { raw, normalized })
    }

    /// Raw candidate states.
    #[must_use]
    pub fn raw(&self) -> &[Vec<f64>] {
        &self.raw
    }

    /// Normalized duel inputs, one per candidate.
    #[must_use]
    pub fn normalized(&self) -> &[Vec<f64>] {
        &self.normalized
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Whether there are no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Enumerates the finite set of next states reachable from a shared state.
pub trait ReachableStates<C>: Send + Sync {
    /// List the candidates reachable from `shared_state` under `policy`.
    ///
    /// # Errors
    ///
    /// Returns
    /// [`UnsupportedDimensionality`](Error::UnsupportedDimensionality) for
    /// two-feature states. An empty result is reported by the acquisition
    /// engine as [`NoReachableStates`](Error::NoReachableStates).
    fn enumerate(
        &self,
        shared_state: &[f64],
        config: &C,
        policy: ReachablePolicy,
    ) -> Result<ReachableStateSet>;
}

/// Grid-based enumeration over the configured state bounds.
///
/// - [`ReachablePolicy::Grid1D`]: every grid point in the bounds.
/// - [`ReachablePolicy::Physical`]: grid points no further than
///   `max_step` from the shared state.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridReachability;

/// Upper limit on the number of grid points a configuration may ask for.
pub const MAX_GRID_POINTS: usize = 100_000;

impl GridReachability {
    /// All grid points `lo, lo + step, …` not exceeding `hi`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the bounds are not finite and ordered,
    /// the step is not positive, or the grid would exceed
    /// [`MAX_GRID_POINTS`].
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn grid(config: &ElicitConfig) -> Result<Vec<f64>> {
        let (lo, hi) = config.bounds;
        let step = config.grid_step;
        if !(lo.is_finite() && hi.is_finite()) || lo > hi {
            return Err(Error::Config(format!(
                "bounds must be finite with low <= high, got ({lo}, {hi})"
            )));
        }
        if !step.is_finite() || step <= 0.0 {
            return Err(Error::Config(format!(
                "grid_step must be positive, got {step}"
            )));
        }

        let intervals = ((hi - lo) / step + 1e-9).floor();
        if !intervals.is_finite() || intervals >= MAX_GRID_POINTS as f64 {
            return Err(Error::Config(format!(
                "grid over ({lo}, {hi}) with step {step} exceeds {MAX_GRID_POINTS} points"
            )));
        }
        let n = intervals as usize + 1;
        Ok((0..n).map(|i| lo + i as f64 * step).collect())
    }
}

impl ReachableStates<ElicitConfig> for GridReachability {
    fn enumerate(
        &self,
        shared_state: &[f64],
        config: &ElicitConfig,
        policy: ReachablePolicy,
    ) -> Result<ReachableStateSet> {
        let dim = FeatureDim::from_duel_width(2 * shared_state.len())?;
        dim.require_one()?;
        let shared = shared_state[0];

        let raw: Vec<Vec<f64>> = Self::grid(config)?
            .into_iter()
            .filter(|&state| match policy {
                ReachablePolicy::Grid1D => true,
                ReachablePolicy::Physical => (state - shared).abs() <= config.max_step + 1e-9,
            })
            .map(|state| vec![state])
            .collect();

        let normalized = raw
            .iter()
            .map(|state| {
                BoundsNormalizer::normalize_row(
                    Duel::from_states(shared_state, state).features(),
                    config,
                )
            })
            .collect();

        ReachableStateSet::new(raw, normalized)
    }
}
