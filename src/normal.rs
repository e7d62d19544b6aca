//! Standard normal density and distribution function.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

fn std_normal() -> Normal {
    Normal::standard()
}

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    std_normal().pdf(x)
}

/// Standard normal CDF.
///
/// `statrs` evaluates this through `erfc`, so the lower tail keeps relative
/// precision for strongly negative z-scores.
pub(crate) fn norm_cdf(x: f64) -> f64 {
    std_normal().cdf(x)
}
