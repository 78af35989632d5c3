//! Mean squared reconstruction error.

use crate::model::ForwardModel;
use crate::Scalar;

/// `loss(y, x) = mean_over_M((y − f(x))²)` for one trial.
///
/// Generic in both arguments so that either group can carry tangents.
/// An empty observation yields NaN.
#[inline]
pub fn reconstruction_loss<T: Scalar>(model: &ForwardModel, y: &[T], x: T) -> T {
    let fx = model.evaluate(x);
    let mut sum = T::zero();
    for &yi in y {
        let r = yi - fx;
        sum = sum + r * r;
    }
    sum / T::lit(y.len() as f64)
}

/// Loss over a whole trial batch: the sum of all `M × N` squared residuals
/// divided by `M · N`, i.e. the mean of the per-trial losses.
///
/// `observations` is trial-major with `dims` entries per trial.
pub fn batch_loss(model: &ForwardModel, observations: &[f64], dims: usize, estimates: &[f64]) -> f64 {
    assert_eq!(
        observations.len(),
        dims * estimates.len(),
        "observations length ({}) must equal dims ({}) × trials ({})",
        observations.len(),
        dims,
        estimates.len()
    );
    let total: f64 = observations
        .chunks(dims)
        .zip(estimates)
        .map(|(y, &x)| reconstruction_loss(model, y, x))
        .sum();
    total / estimates.len() as f64
}
