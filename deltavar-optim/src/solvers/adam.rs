use num_traits::Float;

use crate::objective::Objective;
use crate::result::{OptimResult, TerminationReason};

/// Configuration for the Adam solver.
///
/// There is no convergence test: the solver always runs exactly
/// `iterations` updates.
#[derive(Debug, Clone)]
pub struct AdamConfig<F> {
    /// Iteration budget (default: 100).
    pub iterations: usize,
    /// Step size `α` (default: 1e-3).
    pub learning_rate: F,
    /// First-moment decay (default: 0.9).
    pub beta1: F,
    /// Second-moment decay (default: 0.999).
    pub beta2: F,
    /// Denominator guard (default: 1e-8).
    pub epsilon: F,
}

impl Default for AdamConfig<f64> {
    fn default() -> Self {
        AdamConfig {
            iterations: 100,
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl Default for AdamConfig<f32> {
    fn default() -> Self {
        AdamConfig {
            iterations: 100,
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl<F: Float> AdamConfig<F> {
    fn is_valid(&self) -> bool {
        let unit = |b: F| b >= F::zero() && b < F::one();
        self.learning_rate.is_finite()
            && self.learning_rate > F::zero()
            && unit(self.beta1)
            && unit(self.beta2)
            && self.epsilon.is_finite()
            && self.epsilon >= F::zero()
    }
}

/// Adam optimization.
///
/// Minimizes `obj` starting from `x0` with per-coordinate adaptive steps
/// `α · m̂ / (√v̂ + ε)` using bias-corrected first and second moment
/// estimates. Each coordinate's moments see only its own gradient entry, so
/// separable objectives are minimized coordinate-wise in lockstep.
///
/// The objective value is recorded before every update; non-finite values are
/// carried along rather than detected.
pub fn adam<F: Float, O: Objective<F>>(
    obj: &mut O,
    x0: &[F],
    config: &AdamConfig<F>,
) -> OptimResult<F> {
    let n = x0.len();

    if !config.is_valid() {
        return OptimResult {
            x: x0.to_vec(),
            loss_history: Vec::new(),
            gradient_norm: F::nan(),
            iterations: 0,
            func_evals: 0,
            termination: TerminationReason::InvalidConfig,
        };
    }

    let one = F::one();
    let mut x = x0.to_vec();
    let mut m = vec![F::zero(); n];
    let mut v = vec![F::zero(); n];
    let mut loss_history = Vec::with_capacity(config.iterations);
    let mut gradient_norm = F::nan();
    let mut beta1_t = one;
    let mut beta2_t = one;

    for iter in 0..config.iterations {
        let (value, grad) = obj.eval_grad(&x);
        debug_assert_eq!(grad.len(), n);
        loss_history.push(value);
        gradient_norm = norm(&grad);

        beta1_t = beta1_t * config.beta1;
        beta2_t = beta2_t * config.beta2;
        let bias1 = one - beta1_t;
        let bias2 = one - beta2_t;

        for i in 0..n {
            let g = grad[i];
            m[i] = config.beta1 * m[i] + (one - config.beta1) * g;
            v[i] = config.beta2 * v[i] + (one - config.beta2) * g * g;
            let m_hat = m[i] / bias1;
            let v_hat = v[i] / bias2;
            x[i] = x[i] - config.learning_rate * m_hat / (v_hat.sqrt() + config.epsilon);
        }

        log::trace!(
            "adam iteration {}: loss = {:?}, |g| = {:?}",
            iter,
            value.to_f64(),
            gradient_norm.to_f64()
        );
    }

    OptimResult {
        x,
        loss_history,
        gradient_norm,
        iterations: config.iterations,
        func_evals: config.iterations,
        termination: TerminationReason::MaxIterations,
    }
}

/// L2 norm of a vector.
fn norm<F: Float>(v: &[F]) -> F {
    v.iter().fold(F::zero(), |acc, &x| acc + x * x).sqrt()
}
