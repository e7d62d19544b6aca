//! Core types shared by the acquisition engine and its collaborators.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of features describing a single state.
///
/// A duel carries two states, so its feature vector is twice as wide.
/// Only [`FeatureDim::One`] is supported end to end; every operation on
/// [`FeatureDim::Two`] returns [`Error::UnsupportedDimensionality`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureDim {
    /// One feature per state (e.g. operating temperature).
    One,
    /// Two features per state. Recognized but not implemented.
    Two,
}

impl FeatureDim {
    /// Infer the per-state dimensionality from a duel width.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDimensionality`] if the width is odd or
    /// does not correspond to one or two features per state.
    pub fn from_duel_width(width: usize) -> Result<Self> {
        if width % 2 != 0 {
            return Err(Error::UnsupportedDimensionality {
                width,
                reason: "duel width must be even",
            });
        }
        match width / 2 {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            _ => Err(Error::UnsupportedDimensionality {
                width,
                reason: "only one or two features per state are recognized",
            }),
        }
    }

    /// Number of features per state.
    #[must_use]
    pub fn features(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Width of a duel feature vector for this dimensionality.
    #[must_use]
    pub fn duel_width(self) -> usize {
        2 * self.features()
    }

    /// Fail unless this is the supported single-feature case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDimensionality`] for [`FeatureDim::Two`].
    pub fn require_one(self) -> Result<()> {
        match self {
            Self::One => Ok(()),
            Self::Two => Err(Error::UnsupportedDimensionality {
                width: self.duel_width(),
                reason: "two-feature elicitation is not implemented",
            }),
        }
    }
}

/// Which reachable-state enumeration to use for the next duel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReachablePolicy {
    /// Every state the system can physically move to from the shared state.
    Physical,
    /// The restricted one-dimensional grid policy.
    #[default]
    Grid1D,
}

/// Identifier selecting which GP model variant the engine trains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u32);

impl core::fmt::Display for ModelId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "model {}", self.0)
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self(2)
    }
}
