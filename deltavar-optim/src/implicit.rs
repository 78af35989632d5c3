//! Implicit-function-theorem covariance propagation through the retrieval.
//!
//! At a converged estimate the loss gradient vanishes, `∇ₓL(x̂, y) = 0`.
//! Differentiating that condition in `y` gives the retrieval Jacobian
//! `dx̂/dy = −H⁻¹ · J_xy` with `H = ∇ₓ²L` (`D × D`) and
//! `J_xy = ∇ₓ∇_yL` (`D × M`), and linear propagation gives
//! `Σ_x = J_R Σ_noise J_Rᵀ`.

use std::str::FromStr;

use deltavar::{
    hessian, mixed_partials, reconstruction_loss, second_derivative, Dual2, ForwardModel, Scalar,
};
use serde::{Deserialize, Serialize};

use crate::error::PropagationError;
use crate::laplace;
use crate::linalg::{cholesky, invert, lu_back_solve, lu_factor, matmul, transpose};
use crate::measurement::NoiseCovariance;

/// Smallest admissible `|H|` relative to [`LossDerivatives::curvature_scale`].
const CURVATURE_TOL: f64 = 1e-8;

/// How the loss derivatives at the operating point are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeSource {
    /// Nested forward-mode differentiation of the loss.
    #[default]
    Automatic,
    /// Hand-derived formulas from the model's `f'` and `f''`.
    ClosedForm,
}

impl FromStr for DerivativeSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "automatic" | "auto" | "ad" => Ok(DerivativeSource::Automatic),
            "closed_form" | "closed" | "analytic" => Ok(DerivativeSource::ClosedForm),
            other => Err(format!(
                "unknown derivative source `{other}` (expected `automatic` or `closed_form`)"
            )),
        }
    }
}

/// A converged estimate together with the observation it was fitted to.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingPoint {
    pub x: f64,
    pub y: Vec<f64>,
}

impl OperatingPoint {
    pub fn new(x: f64, y: &[f64]) -> Self {
        OperatingPoint { x, y: y.to_vec() }
    }

    pub fn dims(&self) -> usize {
        self.y.len()
    }
}

/// Loss value and derivatives at an operating point.
#[derive(Debug, Clone, PartialEq)]
pub struct LossDerivatives {
    pub value: f64,
    /// `∇ₓL`, length `D`.
    pub gradient: Vec<f64>,
    /// `∇ₓ²L`, `D × D`.
    pub hessian: Vec<Vec<f64>>,
    /// `∇ₓ∇_yL`, `D × M`.
    pub mixed: Vec<Vec<f64>>,
    /// Magnitude of the terms the Hessian is summed from,
    /// `2/M · (Σ f'² + |Σ r| · |f''|)`. A Hessian far below this scale is
    /// the residue of cancellation.
    pub curvature_scale: f64,
}

/// Evaluate the loss and its first and second derivatives at `point`.
pub fn loss_derivatives(
    model: &ForwardModel,
    point: &OperatingPoint,
    source: DerivativeSource,
) -> LossDerivatives {
    match source {
        DerivativeSource::Automatic => automatic_derivatives(model, point),
        DerivativeSource::ClosedForm => closed_form_derivatives(model, point),
    }
}

fn automatic_derivatives(model: &ForwardModel, point: &OperatingPoint) -> LossDerivatives {
    let y_const: Vec<Dual2<f64>> = point.y.iter().map(|&v| Dual2::<f64>::from_f(v)).collect();
    let (value, gradient, hessian) =
        hessian(|xs| reconstruction_loss(model, &y_const, xs[0]), &[point.x]);
    let mixed = mixed_partials(
        |xs, ys| reconstruction_loss(model, ys, xs[0]),
        &[point.x],
        &point.y,
    );

    let (f, df, d2f) = second_derivative(|t| model.evaluate(t), point.x);
    let residual_sum: f64 = point.y.iter().map(|&yj| yj - f).sum();
    LossDerivatives {
        value,
        gradient,
        hessian,
        mixed,
        curvature_scale: curvature_scale(point.dims(), residual_sum, df, d2f),
    }
}

fn closed_form_derivatives(model: &ForwardModel, point: &OperatingPoint) -> LossDerivatives {
    let x = point.x;
    let m = point.dims() as f64;
    let f = model.evaluate(x);
    let df = model.derivative(x);
    let d2f = model.second_derivative(x);

    let mut value = 0.0;
    let mut residual_sum = 0.0;
    for &yj in &point.y {
        let r = yj - f;
        value += r * r;
        residual_sum += r;
    }

    LossDerivatives {
        value: value / m,
        gradient: vec![-2.0 / m * residual_sum * df],
        hessian: vec![vec![2.0 / m * (m * df * df - residual_sum * d2f)]],
        mixed: vec![vec![-2.0 / m * df; point.dims()]],
        curvature_scale: curvature_scale(point.dims(), residual_sum, df, d2f),
    }
}

fn curvature_scale(dims: usize, residual_sum: f64, df: f64, d2f: f64) -> f64 {
    let m = dims as f64;
    2.0 / m * (m * df * df + residual_sum.abs() * d2f.abs())
}

/// Retrieval Jacobian `J_R = −H⁻¹ · J_xy` (`D × M`).
///
/// Solves one LU system per column of `J_xy`. Returns `None` if `H` is
/// singular.
pub fn retrieval_jacobian(hessian: &[Vec<f64>], mixed: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let d = hessian.len();
    let m = mixed.first().map_or(0, Vec::len);
    let factors = lu_factor(hessian)?;

    let mut result = vec![vec![0.0; m]; d];
    for j in 0..m {
        let col: Vec<f64> = mixed.iter().map(|row| -row[j]).collect();
        let sol = lu_back_solve(&factors, &col);
        for (row, v) in result.iter_mut().zip(sol) {
            row[j] = v;
        }
    }
    Some(result)
}

/// `J Σ Jᵀ` for a `D × M` Jacobian and the noise covariance.
pub fn propagate_covariance(jacobian: &[Vec<f64>], noise: &NoiseCovariance) -> Vec<Vec<f64>> {
    matmul(&matmul(jacobian, noise.matrix()), &transpose(jacobian))
}

/// Analytic covariance estimates at one operating point.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticEstimates {
    pub point: OperatingPoint,
    pub derivatives: LossDerivatives,
    pub hessian_inverse: Vec<Vec<f64>>,
    pub retrieval_jacobian: Vec<Vec<f64>>,
    /// IFT covariance `J_R Σ J_Rᵀ`.
    pub ift: Vec<Vec<f64>>,
    /// Corrected Laplace covariance `H⁻¹ J_xy Σ J_xyᵀ H⁻¹`.
    pub laplace: Vec<Vec<f64>>,
    /// Naive Laplace covariance `σ̄² H⁻¹`.
    pub laplace_simple: Vec<Vec<f64>>,
}

impl AnalyticEstimates {
    pub fn ift_variance(&self) -> f64 {
        self.ift[0][0]
    }

    pub fn laplace_variance(&self) -> f64 {
        self.laplace[0][0]
    }

    pub fn laplace_simple_variance(&self) -> f64 {
        self.laplace_simple[0][0]
    }
}

/// Compute the IFT and both Laplace covariances at `point`.
///
/// The point is assumed to be a converged minimiser; this is not checked, but
/// the gradient is kept in the result for inspection. Fails when the point is
/// outside the model domain, when the observation is not finite, or when the
/// loss Hessian is not finite, singular, lost to cancellation, or not
/// positive definite.
pub fn analytic_estimates(
    model: &ForwardModel,
    point: &OperatingPoint,
    noise: &NoiseCovariance,
    source: DerivativeSource,
) -> Result<AnalyticEstimates, PropagationError> {
    if point.dims() != noise.dims() {
        return Err(PropagationError::DimensionMismatch {
            expected: noise.dims(),
            found: point.dims(),
        });
    }
    if !point.x.is_finite() || !model.contains(point.x) {
        return Err(PropagationError::DomainViolation {
            model: model.name(),
            x: point.x,
        });
    }
    if let Some((index, &value)) = point.y.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(PropagationError::NonFiniteObservation { index, value });
    }

    let derivatives = loss_derivatives(model, point, source);
    let h = &derivatives.hessian;
    let singular = |reason| PropagationError::SingularCurvature {
        hessian: h.clone(),
        reason,
    };

    if h.iter().flatten().any(|v| !v.is_finite()) {
        return Err(singular("non-finite entries"));
    }
    let hessian_inverse = invert(h).ok_or_else(|| singular("singular"))?;
    if h.len() == 1 && h[0][0].abs() <= CURVATURE_TOL * derivatives.curvature_scale {
        return Err(singular("ill-conditioned"));
    }
    if !is_positive_definite(h) {
        return Err(singular("not positive definite"));
    }
    let retrieval_jacobian =
        retrieval_jacobian(h, &derivatives.mixed).ok_or_else(|| singular("singular"))?;

    let ift = propagate_covariance(&retrieval_jacobian, noise);
    let laplace = laplace::corrected(&hessian_inverse, &derivatives.mixed, noise);
    let laplace_simple = laplace::naive(&hessian_inverse, noise.mean_variance());

    log::debug!(
        "analytic estimates at x = {}: loss = {:e}, grad = {:?}, H = {:?}",
        point.x,
        derivatives.value,
        derivatives.gradient,
        h
    );

    Ok(AnalyticEstimates {
        point: point.clone(),
        derivatives,
        hessian_inverse,
        retrieval_jacobian,
        ift,
        laplace,
        laplace_simple,
    })
}

fn is_positive_definite(h: &[Vec<f64>]) -> bool {
    match cholesky(h, 0.0) {
        Some(l) => l.iter().enumerate().all(|(i, row)| row[i] > 0.0),
        None => false,
    }
}
