//! Laplace-style covariance approximations built from the loss Hessian.

use crate::linalg::{matmul, transpose};
use crate::measurement::NoiseCovariance;

/// Naive Laplace covariance `σ̄² · H⁻¹`.
///
/// Treats the loss as a negative log-likelihood whose noise scale is the
/// mean component variance. This ignores the `2/M` normalisation of the loss
/// and is off by a model-independent factor in general.
pub fn naive(hessian_inverse: &[Vec<f64>], mean_variance: f64) -> Vec<Vec<f64>> {
    hessian_inverse
        .iter()
        .map(|row| row.iter().map(|&v| mean_variance * v).collect())
        .collect()
}

/// Corrected Laplace (sandwich) covariance `H⁻¹ J_xy Σ J_xyᵀ H⁻¹`.
///
/// With `H` symmetric this equals the IFT covariance exactly; the two are
/// computed through different matrix paths.
pub fn corrected(
    hessian_inverse: &[Vec<f64>],
    mixed: &[Vec<f64>],
    noise: &NoiseCovariance,
) -> Vec<Vec<f64>> {
    let meat = matmul(&matmul(mixed, noise.matrix()), &transpose(mixed));
    matmul(&matmul(hessian_inverse, &meat), hessian_inverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naive_scales_inverse() {
        let out = naive(&[vec![0.5]], 4.0);
        assert_eq!(out, vec![vec![2.0]]);
    }

    #[test]
    fn corrected_sandwich_two_dims() {
        let noise = NoiseCovariance::diagonal(&[1.0, 3.0]).unwrap();
        // H⁻¹ = 1/2, J = [1, 2] -> (1/4)(1 + 12)
        let out = corrected(&[vec![0.5]], &[vec![1.0, 2.0]], &noise);
        assert!((out[0][0] - 3.25).abs() < 1e-14);
    }
}
