//! Duels and the append-only duel history.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::FeatureDim;

/// A pairwise comparison stimulus: `(previous, current)` states concatenated
/// into one feature vector of width `2F`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Duel {
    features: Vec<f64>,
}

impl Duel {
    /// Creates a duel from its concatenated feature vector.
    #[must_use]
    pub fn new(features: Vec<f64>) -> Self {
        Self { features }
    }

    /// Creates a duel from its two states.
    #[must_use]
    pub fn from_states(previous: &[f64], current: &[f64]) -> Self {
        let mut features = Vec::with_capacity(previous.len() + current.len());
        features.extend_from_slice(previous);
        features.extend_from_slice(current);
        Self { features }
    }

    /// The concatenated feature vector.
    #[must_use]
    pub fn features(&self) -> &[f64] {
        &self.features
    }

    /// Width of the feature vector (`2F`).
    #[must_use]
    pub fn width(&self) -> usize {
        self.features.len()
    }

    /// The first half: the state the occupant comes from.
    #[must_use]
    pub fn previous(&self) -> &[f64] {
        &self.features[..self.features.len() / 2]
    }

    /// The second half: the state shared with the next duel.
    #[must_use]
    pub fn current(&self) -> &[f64] {
        &self.features[self.features.len() / 2..]
    }
}

impl From<Vec<f64>> for Duel {
    fn from(features: Vec<f64>) -> Self {
        Self::new(features)
    }
}

/// Ordered duels `X` paired with their observed responses `Y`.
///
/// The history only grows: rows are appended at the end and never modified
/// or reordered. Every duel has the same width.
///
/// # Examples
///
/// ```
/// use elicit::history::{Duel, DuelHistory};
///
/// let mut history = DuelHistory::new();
/// history.push(Duel::new(vec![20.0, 22.0]), 1.0).unwrap();
/// assert_eq!(history.len(), 1);
/// assert_eq!(history.last_shared_state(), Some(&[22.0][..]));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DuelHistory {
    duels: Vec<Duel>,
    responses: Vec<f64>,
}

impl DuelHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history from parallel `X` and `Y` sequences.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseCountMismatch`] if the lengths differ and
    /// [`Error::DimensionMismatch`] if the duels have different widths.
    pub fn from_parts(duels: Vec<Duel>, responses: Vec<f64>) -> Result<Self> {
        if duels.len() != responses.len() {
            return Err(Error::ResponseCountMismatch {
                expected: duels.len(),
                got: responses.len(),
            });
        }
        let mut history = Self {
            duels: Vec::with_capacity(duels.len()),
            responses: Vec::with_capacity(responses.len()),
        };
        for (duel, response) in duels.into_iter().zip(responses) {
            history.push(duel, response)?;
        }
        Ok(history)
    }

    /// Creates a history from raw rows, e.g. `[[20.0, 22.0]]` and `[1.0]`.
    ///
    /// # Errors
    ///
    /// Same as [`DuelHistory::from_parts`].
    pub fn from_rows(rows: &[Vec<f64>], responses: &[f64]) -> Result<Self> {
        Self::from_parts(
            rows.iter().cloned().map(Duel::new).collect(),
            responses.to_vec(),
        )
    }

    /// Appends a duel and its response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the duel's width differs from
    /// the duels already recorded.
    pub fn push(&mut self, duel: Duel, response: f64) -> Result<()> {
        if let Some(width) = self.width() {
            if duel.width() != width {
                return Err(Error::DimensionMismatch {
                    expected: width,
                    got: duel.width(),
                });
            }
        }
        self.duels.push(duel);
        self.responses.push(response);
        Ok(())
    }

    /// Number of recorded duels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.duels.len()
    }

    /// Whether no duel has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.duels.is_empty()
    }

    /// Width shared by every duel, or `None` when empty.
    #[must_use]
    pub fn width(&self) -> Option<usize> {
        self.duels.first().map(Duel::width)
    }

    /// Per-state dimensionality of the recorded duels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyHistory`] when nothing has been recorded and
    /// [`Error::UnsupportedDimensionality`] for unrecognized widths.
    pub fn feature_dim(&self) -> Result<FeatureDim> {
        let width = self.width().ok_or(Error::EmptyHistory)?;
        FeatureDim::from_duel_width(width)
    }

    /// The recorded duels `X`.
    #[must_use]
    pub fn duels(&self) -> &[Duel] {
        &self.duels
    }

    /// The recorded responses `Y`.
    #[must_use]
    pub fn responses(&self) -> &[f64] {
        &self.responses
    }

    /// The duels as raw feature rows.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.duels.iter().map(|d| d.features().to_vec()).collect()
    }

    /// The second half of the most recent duel.
    #[must_use]
    pub fn last_shared_state(&self) -> Option<&[f64]> {
        self.duels.last().map(Duel::current)
    }
}
