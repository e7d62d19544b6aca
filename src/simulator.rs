//! Response sources: the human (or a stand-in) answering duels.

use parking_lot::Mutex;

use crate::config::{ElicitConfig, OccupantConfig};
use crate::error::Result;
use crate::history::Duel;
use crate::rng_util;
use crate::types::FeatureDim;

/// Produces one observed preference response per duel.
pub trait ResponseGenerator: Send + Sync {
    /// Answer every duel in the batch, in order.
    ///
    /// # Errors
    ///
    /// Implementations return
    /// [`UnsupportedDimensionality`](crate::Error::UnsupportedDimensionality) for
    /// duels they cannot answer.
    fn respond(&self, duels: &[Duel]) -> Result<Vec<f64>>;
}

impl<F> ResponseGenerator for F
where
    F: Fn(&Duel) -> f64 + Send + Sync,
{
    fn respond(&self, duels: &[Duel]) -> Result<Vec<f64>> {
        Ok(duels.iter().map(self).collect())
    }
}

/// A synthetic occupant with a quadratic comfort utility around a preferred
/// state.
///
/// For a duel `(previous, current)` it answers `1.0` when it prefers the
/// current state and `0.0` otherwise. With `noise > 0` the utility
/// difference is perturbed by Gaussian noise before the comparison.
///
/// # Examples
///
/// ```
/// use elicit::history::Duel;
/// use elicit::simulator::{ResponseGenerator, SyntheticOccupant};
/// use elicit::config::ElicitConfig;
///
/// let occupant = SyntheticOccupant::from_config(&ElicitConfig::default().with_occupant(23.0, 1));
/// let y = occupant
///     .respond(&[Duel::new(vec![20.0, 22.0]), Duel::new(vec![22.0, 27.0])])
///     .unwrap();
/// assert_eq!(y, vec![1.0, 0.0]);
/// ```
pub struct SyntheticOccupant {
    settings: OccupantConfig,
    rng: Mutex<fastrand::Rng>,
}

impl SyntheticOccupant {
    /// Creates an occupant from its settings.
    #[must_use]
    pub fn new(settings: OccupantConfig) -> Self {
        let rng = settings
            .seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        Self {
            settings,
            rng: Mutex::new(rng),
        }
    }

    /// Creates an occupant from the `occupant` section of a configuration.
    #[must_use]
    pub fn from_config(config: &ElicitConfig) -> Self {
        Self::new(config.occupant.clone())
    }

    /// Latent comfort utility of a single-feature state.
    #[must_use]
    pub fn utility(&self, state: f64) -> f64 {
        let z = (state - self.settings.preferred) / self.settings.tolerance;
        -z * z
    }
}

impl ResponseGenerator for SyntheticOccupant {
    fn respond(&self, duels: &[Duel]) -> Result<Vec<f64>> {
        let mut rng = self.rng.lock();
        duels
            .iter()
            .map(|duel| -> Result<f64> {
                FeatureDim::from_duel_width(duel.width())?.require_one()?;
                let mut diff = self.utility(duel.current()[0]) - self.utility(duel.previous()[0]);
                if self.settings.noise > 0.0 {
                    diff += self.settings.noise * rng_util::standard_normal(&mut rng);
                }
                Ok(if diff > 0.0 { 1.0 } else { 0.0 })
            })
            .collect()
    }
}
