/// Errors produced while building or running an elicitation round.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the duel width does not map to a supported feature
    /// dimensionality, or when a two-feature code path is reached.
    #[error("unsupported feature dimensionality: duel width {width} ({reason})")]
    UnsupportedDimensionality {
        /// Width of the offending duel feature vector.
        width: usize,
        /// Why the width was rejected.
        reason: &'static str,
    },

    /// Returned when the GP engine fails to fit (e.g. non-convergence or a
    /// kernel matrix that is not positive definite).
    #[error("model training failed: {0}")]
    ModelTraining(String),

    /// Returned when a predicted candidate variance is not strictly positive.
    #[error(
        "invalid predicted variance {variance} for posterior sample {sample}, candidate {candidate}"
    )]
    InvalidVariance {
        /// Row (posterior sample) of the offending entry.
        sample: usize,
        /// Column (reachable candidate) of the offending entry.
        candidate: usize,
        /// The variance that was predicted.
        variance: f64,
    },

    /// Returned when no next state is reachable from the shared state.
    #[error("no reachable states from shared state {shared_state:?}")]
    NoReachableStates {
        /// The shared state the enumeration started from.
        shared_state: Vec<f64>,
    },

    /// Returned when a per-iteration artifact cannot be written or read.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Returned when an acquisition engine is requested for an empty history.
    #[error("duel history is empty; at least one duel is needed to define the shared state")]
    EmptyHistory,

    /// Returned when a duel's width differs from the rest of the history.
    #[error("dimension mismatch: expected duel width {expected}, got {got}")]
    DimensionMismatch {
        /// Width of the duels already in the history.
        expected: usize,
        /// Width of the rejected duel.
        got: usize,
    },

    /// Returned when a response source answers with the wrong number of responses.
    #[error("response count mismatch: expected {expected} responses, got {got}")]
    ResponseCountMismatch {
        /// Number of duels that were asked about.
        expected: usize,
        /// Number of responses that came back.
        got: usize,
    },

    /// Returned when a prediction matrix has the wrong shape.
    #[error("{matrix} has shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        /// Name of the offending matrix.
        matrix: &'static str,
        /// Expected `(rows, cols)`.
        expected: (usize, usize),
        /// Actual `(rows, cols)`.
        got: (usize, usize),
    },

    /// Returned when a model identifier does not select a known model.
    #[error("unknown model id {0}")]
    UnknownModel(u32),

    /// Returned when a configuration is invalid or cannot be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Returned when a diagnostics report cannot be produced.
    #[error("diagnostics error: {0}")]
    Diagnostics(String),

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),

    /// Returned when a blocking round task fails.
    #[cfg(feature = "async")]
    #[error("async task error: {0}")]
    TaskError(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Whether this error aborts the current round before a decision exists.
    ///
    /// Persistence and diagnostics failures happen after the decision is made
    /// and never invalidate it.
    #[must_use]
    pub fn is_round_fatal(&self) -> bool {
        !matches!(self, Error::Persistence(_) | Error::Diagnostics(_))
    }
}
