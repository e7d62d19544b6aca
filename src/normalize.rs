//! Mapping raw duel features into the GP input space.

use crate::config::ElicitConfig;
use crate::error::Result;
use crate::history::Duel;
use crate::types::FeatureDim;

/// Maps raw paired-state feature vectors to normalized GP inputs.
///
/// Normalization parameters come from the configuration and the feature
/// dimensionality; they are never learned from the data, so the same raw
/// duel always maps to the same input across rounds.
pub trait FeatureNormalizer<C>: Send + Sync {
    /// Normalize every duel. The output has one row per duel, each of width
    /// `dim.duel_width()`.
    ///
    /// # Errors
    ///
    /// Implementations return
    /// [`UnsupportedDimensionality`](crate::Error::UnsupportedDimensionality)
    /// for dimensionalities they cannot handle.
    fn normalize(&self, duels: &[Duel], dim: FeatureDim, config: &C) -> Result<Vec<Vec<f64>>>;
}

/// Min-max normalization of every state feature onto `[0, 1]` using the
/// configured state bounds.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundsNormalizer;

impl BoundsNormalizer {
    /// Normalize a single feature value.
    #[must_use]
    pub fn scale(value: f64, lo: f64, hi: f64) -> f64 {
        if (hi - lo).abs() < 1e-15 {
            0.5
        } else {
            (value - lo) / (hi - lo)
        }
    }

    /// Normalize one raw feature row with the configured bounds.
    #[must_use]
    pub fn normalize_row(row: &[f64], config: &ElicitConfig) -> Vec<f64> {
        let (lo, hi) = config.bounds;
        row.iter().map(|&v| Self::scale(v, lo, hi)).collect()
    }
}

impl FeatureNormalizer<ElicitConfig> for BoundsNormalizer {
    fn normalize(
        &self,
        duels: &[Duel],
        dim: FeatureDim,
        config: &ElicitConfig,
    ) -> Result<Vec<Vec<f64>>> {
        dim.require_one()?;
        Ok(duels
            .iter()
            .map(|duel| Self::normalize_row(duel.features(), config))
            .collect())
    }
}
