//! Derivative drivers built on forward-mode duals.
//!
//! First-order quantities use a single tangent (`Dual<F>`); second-order
//! quantities nest two tangents (`Dual<Dual<F>>`, forward-over-forward).

use crate::dual::Dual;
use crate::float::Float;

/// Second-order forward-mode value: inner tangent in `re.eps`, outer tangent
/// in `eps.re`, mixed second derivative in `eps.eps`.
pub type Dual2<F> = Dual<Dual<F>>;

/// Seed a second-order input with independent inner and outer directions.
#[inline]
fn seed2<F: Float>(val: F, inner: F, outer: F) -> Dual2<F> {
    Dual {
        re: Dual::new(val, inner),
        eps: Dual::new(outer, F::zero()),
    }
}

#[inline]
fn unit<F: Float>(hit: bool) -> F {
    if hit {
        F::one()
    } else {
        F::zero()
    }
}

/// Value and first derivative of a scalar function `f : R → R`.
///
/// ```
/// let (v, d) = deltavar::derivative(|x| x * x * x, 2.0_f64);
/// assert!((v - 8.0).abs() < 1e-12);
/// assert!((d - 12.0).abs() < 1e-12);
/// ```
pub fn derivative<F: Float>(f: impl Fn(Dual<F>) -> Dual<F>, x: F) -> (F, F) {
    let out = f(Dual::variable(x));
    (out.re, out.eps)
}

/// Value, first and second derivative of a scalar function `f : R → R`.
pub fn second_derivative<F: Float>(f: impl Fn(Dual2<F>) -> Dual2<F>, x: F) -> (F, F, F) {
    let out = f(seed2(x, F::one(), F::one()));
    (out.re.re, out.re.eps, out.eps.eps)
}

/// Value and gradient of `f : R^n → R` using one forward pass per input.
pub fn gradient<F: Float>(f: impl Fn(&[Dual<F>]) -> Dual<F>, x: &[F]) -> (F, Vec<F>) {
    let n = x.len();
    let mut value = F::zero();
    let mut grad = vec![F::zero(); n];

    if n == 0 {
        let inputs: Vec<Dual<F>> = Vec::new();
        return (f(&inputs).re, grad);
    }

    for j in 0..n {
        let inputs: Vec<Dual<F>> = x
            .iter()
            .enumerate()
            .map(|(k, &xk)| Dual::new(xk, unit(k == j)))
            .collect();
        let out = f(&inputs);
        value = out.re;
        grad[j] = out.eps;
    }

    (value, grad)
}

/// Value, gradient and full Hessian of `f : R^n → R` via forward-over-forward.
///
/// Runs one nested pass per upper-triangular entry and mirrors the result;
/// `hessian[i][j] = ∂²f/∂x_i∂x_j`.
pub fn hessian<F: Float>(
    f: impl Fn(&[Dual2<F>]) -> Dual2<F>,
    x: &[F],
) -> (F, Vec<F>, Vec<Vec<F>>) {
    let n = x.len();
    let mut value = F::zero();
    let mut grad = vec![F::zero(); n];
    let mut hess = vec![vec![F::zero(); n]; n];

    for i in 0..n {
        for j in i..n {
            let inputs: Vec<Dual2<F>> = x
                .iter()
                .enumerate()
                .map(|(k, &xk)| seed2(xk, unit(k == i), unit(k == j)))
                .collect();
            let out = f(&inputs);
            value = out.re.re;
            if i == j {
                grad[i] = out.re.eps;
            }
            hess[i][j] = out.eps.eps;
            hess[j][i] = out.eps.eps;
        }
    }

    (value, grad, hess)
}

/// Mixed second partials of `f(x, y)` between two argument groups.
///
/// Differentiates with respect to `x` on the inner tangent, then
/// differentiates that gradient with respect to `y` on the outer tangent.
/// Returns a `x.len() × y.len()` matrix with `result[i][j] = ∂²f/∂x_i∂y_j`.
pub fn mixed_partials<F: Float>(
    f: impl Fn(&[Dual2<F>], &[Dual2<F>]) -> Dual2<F>,
    x: &[F],
    y: &[F],
) -> Vec<Vec<F>> {
    let mut result = vec![vec![F::zero(); y.len()]; x.len()];

    for (i, row) in result.iter_mut().enumerate() {
        let xs: Vec<Dual2<F>> = x
            .iter()
            .enumerate()
            .map(|(k, &xk)| seed2(xk, unit(k == i), F::zero()))
            .collect();
        for (j, entry) in row.iter_mut().enumerate() {
            let ys: Vec<Dual2<F>> = y
                .iter()
                .enumerate()
                .map(|(k, &yk)| seed2(yk, F::zero(), unit(k == j)))
                .collect();
            *entry = f(&xs, &ys).eps.eps;
        }
    }

    result
}
