//! Configuration for the reference collaborators.
//!
//! The acquisition engine never looks inside a configuration: it receives an
//! opaque `&C` and hands it to the normalizer, the GP engine and the
//! reachable-state enumerator. [`ElicitConfig`] is the configuration those
//! reference collaborators understand, loadable from JSON:
//!
//! ```
//! use elicit::config::ElicitConfig;
//!
//! let config = ElicitConfig::from_json_str(
//!     r#"{ "name": "office", "bounds": [18.0, 28.0], "grid_step": 0.5, "max_step": 2.0 }"#,
//! )
//! .unwrap();
//! assert_eq!(config.bounds, (18.0, 28.0));
//! assert_eq!(config.gp.n_samples, 100);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings for the sampled-hyperparameter GP engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpConfig {
    /// Number of posterior hyperparameter samples kept per round.
    pub n_samples: usize,
    /// Metropolis steps discarded before the first kept sample.
    pub burn_in: usize,
    /// Metropolis steps between kept samples.
    pub thin: usize,
    /// Standard deviation of the random-walk proposal in log space.
    pub proposal_scale: f64,
    /// Observation noise variance added to the kernel diagonal.
    pub noise_variance: f64,
    /// RNG seed for the sampler; random when absent.
    pub seed: Option<u64>,
}

impl Default for GpConfig {
    fn default() -> Self {
        Self {
            n_samples: 100,
            burn_in: 200,
            thin: 2,
            proposal_scale: 0.25,
            noise_variance: 1e-2,
            seed: None,
        }
    }
}

/// Settings for the synthetic occupant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupantConfig {
    /// State the occupant likes best.
    pub preferred: f64,
    /// Distance from `preferred` at which utility has dropped by one unit.
    pub tolerance: f64,
    /// Standard deviation of Gaussian noise on the utility difference.
    pub noise: f64,
    /// RNG seed for response noise; random when absent.
    pub seed: Option<u64>,
}

impl Default for OccupantConfig {
    fn default() -> Self {
        Self {
            preferred: 23.0,
            tolerance: 2.0,
            noise: 0.0,
            seed: None,
        }
    }
}

/// Configuration consumed by the reference normalizer, GP engine,
/// reachable-state enumerator and synthetic occupant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElicitConfig {
    /// Human-readable name of the configuration.
    pub name: String,
    /// Lower and upper bound of a state feature (e.g. operating temperature).
    pub bounds: (f64, f64),
    /// Spacing of the candidate state grid.
    pub grid_step: f64,
    /// Largest change of state the system can make between two duels.
    pub max_step: f64,
    /// GP engine settings.
    pub gp: GpConfig,
    /// Synthetic occupant settings.
    pub occupant: OccupantConfig,
}

impl Default for ElicitConfig {
    fn default() -> Self {
        Self {
            name: "thermal".to_string(),
            bounds: (18.0, 30.0),
            grid_step: 0.5,
            max_step: 3.0,
            gp: GpConfig::default(),
            occupant: OccupantConfig::default(),
        }
    }
}

impl ElicitConfig {
    /// Parse and validate a configuration from a JSON string.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is malformed or the values are
    /// inconsistent (see [`validate`](Self::validate)).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed, or the
    /// values are inconsistent.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Check that the configuration describes a usable state space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the bounds are empty or not finite,
    /// a step is not positive, or the GP sampler would keep no samples.
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.bounds;
        if !(lo.is_finite() && hi.is_finite()) || lo >= hi {
            return Err(Error::Config(format!(
                "bounds must be finite with low < high, got ({lo}, {hi})"
            )));
        }
        if self.grid_step <= 0.0 || !self.grid_step.is_finite() {
            return Err(Error::Config(format!(
                "grid_step must be positive, got {}",
                self.grid_step
            )));
        }
        if self.max_step <= 0.0 || !self.max_step.is_finite() {
            return Err(Error::Config(format!(
                "max_step must be positive, got {}",
                self.max_step
            )));
        }
        if self.gp.n_samples == 0 {
            return Err(Error::Config("gp.n_samples must be at least 1".to_string()));
        }
        if self.gp.thin == 0 {
            return Err(Error::Config("gp.thin must be at least 1".to_string()));
        }
        if self.gp.proposal_scale <= 0.0 || self.gp.noise_variance <= 0.0 {
            return Err(Error::Config(
                "gp.proposal_scale and gp.noise_variance must be positive".to_string(),
            ));
        }
        if self.occupant.tolerance <= 0.0 || self.occupant.noise < 0.0 {
            return Err(Error::Config(
                "occupant.tolerance must be positive and occupant.noise non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the GP sampler seed.
    #[must_use]
    pub fn with_gp_seed(mut self, seed: u64) -> Self {
        self.gp.seed = Some(seed);
        self
    }

    /// Sets the number of posterior samples and the burn-in length.
    #[must_use]
    pub fn with_gp_samples(mut self, n_samples: usize, burn_in: usize) -> Self {
        self.gp.n_samples = n_samples;
        self.gp.burn_in = burn_in;
        self
    }

    /// Sets the occupant's preferred state and noise seed.
    #[must_use]
    pub fn with_occupant(mut self, preferred: f64, seed: u64) -> Self {
        self.occupant.preferred = preferred;
        self.occupant.seed = Some(seed);
        self
    }
}
