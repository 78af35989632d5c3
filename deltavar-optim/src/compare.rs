//! Monte Carlo statistics and relative-error comparisons.

use crate::implicit::AnalyticEstimates;

/// Floor on the denominator of [`percent_difference`].
const DIFFERENCE_FLOOR: f64 = 1e-10;

/// Empirical statistics of reconstructed estimates over all trials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloSummary {
    pub mean: f64,
    /// Unbiased sample variance (`N − 1` denominator). NaN when `N < 2`.
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub trials: usize,
    /// Estimates that ended NaN or infinite; they are kept in the statistics.
    pub non_finite: usize,
}

impl MonteCarloSummary {
    pub fn from_estimates(estimates: &[f64]) -> Self {
        let n = estimates.len();
        let non_finite = estimates.iter().filter(|v| !v.is_finite()).count();
        if n == 0 {
            return MonteCarloSummary {
                mean: f64::NAN,
                variance: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                trials: 0,
                non_finite,
            };
        }

        let mean = estimates.iter().sum::<f64>() / n as f64;
        let variance = if n < 2 {
            f64::NAN
        } else {
            estimates.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1) as f64
        };
        let (min, max) = estimates
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });

        MonteCarloSummary {
            mean,
            variance,
            min,
            max,
            trials: n,
            non_finite,
        }
    }
}

/// Signed relative error `(estimate − reference) / reference · 100`.
///
/// Not guarded: a zero reference gives ±inf or NaN.
pub fn relative_error_pct(estimate: f64, reference: f64) -> f64 {
    (estimate - reference) / reference * 100.0
}

/// Unsigned difference between two analytic variances, relative to
/// the second: `|a − b| / max(|b|, 1e-10) · 100`.
pub fn percent_difference(a: f64, b: f64) -> f64 {
    (a - b).abs() / b.abs().max(DIFFERENCE_FLOOR) * 100.0
}

/// Analytic variances measured against the Monte Carlo variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    /// IFT vs Monte Carlo, percent.
    pub ift_vs_mc: f64,
    /// Corrected Laplace vs Monte Carlo, percent.
    pub laplace_vs_mc: f64,
    /// Naive Laplace vs Monte Carlo, percent.
    pub laplace_simple_vs_mc: f64,
    /// Unsigned IFT vs corrected Laplace difference, percent. Expected near zero.
    pub ift_vs_laplace: f64,
}

impl Comparison {
    pub fn new(analytic: &AnalyticEstimates, monte_carlo: &MonteCarloSummary) -> Self {
        let mc = monte_carlo.variance;
        Comparison {
            ift_vs_mc: relative_error_pct(analytic.ift_variance(), mc),
            laplace_vs_mc: relative_error_pct(analytic.laplace_variance(), mc),
            laplace_simple_vs_mc: relative_error_pct(analytic.laplace_simple_variance(), mc),
            ift_vs_laplace: percent_difference(analytic.ift_variance(), analytic.laplace_variance()),
        }
    }
}
