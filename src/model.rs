//! Differentiable forward models `f : R → R`.
//!
//! Each variant evaluates generically over [`Scalar`], so the same definition
//! serves plain evaluation, the solver's first-order duals and the
//! propagator's nested duals. Closed-form first and second derivatives are
//! provided alongside for callers that do not want AD.
//!
//! Models are applied element-wise across trials; with `M > 1` observation
//! dimensions every dimension observes the same `f(x)`.

use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::Scalar;

/// Closed set of forward models.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ForwardModel {
    /// `f(x) = scale · x²`. Close to linear over typical noise scales away from 0.
    Quadratic { scale: f64 },
    /// `f(x) = √(radius² − x²)`, defined for `|x| ≤ radius`.
    QuarterCircle { radius: f64 },
    /// `f(x) = −(x − center)³ − (x − center)`.
    Cubic { center: f64 },
    /// `f(x) = baseˣ`.
    Exponential { base: f64 },
}

impl Default for ForwardModel {
    fn default() -> Self {
        ForwardModel::quadratic()
    }
}

impl ForwardModel {
    /// `10 · x²`.
    pub fn quadratic() -> Self {
        ForwardModel::Quadratic { scale: 10.0 }
    }

    /// `√(7² − x²)`.
    pub fn quarter_circle() -> Self {
        ForwardModel::QuarterCircle { radius: 7.0 }
    }

    /// `−(x − 5)³ − (x − 5)`.
    pub fn cubic() -> Self {
        ForwardModel::Cubic { center: 5.0 }
    }

    /// `1.75ˣ`.
    pub fn exponential() -> Self {
        ForwardModel::Exponential { base: 1.75 }
    }

    /// Short kebab-case name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            ForwardModel::Quadratic { .. } => "quadratic",
            ForwardModel::QuarterCircle { .. } => "quarter-circle",
            ForwardModel::Cubic { .. } => "cubic",
            ForwardModel::Exponential { .. } => "exponential",
        }
    }

    /// Check the model parameters.
    pub fn validate(&self) -> Result<(), ModelError> {
        let model = self.name();
        let (name, value) = match *self {
            ForwardModel::Quadratic { scale } => ("scale", scale),
            ForwardModel::QuarterCircle { radius } => ("radius", radius),
            ForwardModel::Cubic { center } => ("center", center),
            ForwardModel::Exponential { base } => ("base", base),
        };
        if !value.is_finite() {
            return Err(ModelError::NonFiniteParameter { model, name, value });
        }
        let reason = match *self {
            ForwardModel::Quadratic { scale } if scale == 0.0 => Some("must be non-zero"),
            ForwardModel::QuarterCircle { radius } if radius <= 0.0 => Some("must be positive"),
            ForwardModel::Exponential { base } if base <= 0.0 || base == 1.0 => {
                Some("must be positive and different from 1")
            }
            _ => None,
        };
        match reason {
            Some(reason) => Err(ModelError::InvalidParameter {
                model,
                name,
                value,
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Whether `x` lies in the model's domain.
    ///
    /// Evaluating outside the domain is not guarded and yields NaN.
    pub fn contains(&self, x: f64) -> bool {
        match *self {
            ForwardModel::QuarterCircle { radius } => x.abs() <= radius,
            _ => x.is_finite(),
        }
    }

    /// Evaluate `f(x)`.
    #[inline]
    pub fn evaluate<T: Scalar>(&self, x: T) -> T {
        match *self {
            ForwardModel::Quadratic { scale } => T::lit(scale) * x.powi(2),
            ForwardModel::QuarterCircle { radius } => (T::lit(radius * radius) - x.powi(2)).sqrt(),
            ForwardModel::Cubic { center } => {
                let u = x - T::lit(center);
                -u.powi(3) - u
            }
            ForwardModel::Exponential { base } => (T::lit(base.ln()) * x).exp(),
        }
    }

    /// Closed-form `f'(x)`.
    pub fn derivative(&self, x: f64) -> f64 {
        match *self {
            ForwardModel::Quadratic { scale } => 2.0 * scale * x,
            ForwardModel::QuarterCircle { radius } => -x / (radius * radius - x * x).sqrt(),
            ForwardModel::Cubic { center } => {
                let u = x - center;
                -3.0 * u * u - 1.0
            }
            ForwardModel::Exponential { base } => base.powf(x) * base.ln(),
        }
    }

    /// Closed-form `f''(x)`.
    pub fn second_derivative(&self, x: f64) -> f64 {
        match *self {
            ForwardModel::Quadratic { scale } => 2.0 * scale,
            ForwardModel::QuarterCircle { radius } => {
                let r2 = radius * radius;
                -r2 / (r2 - x * x).powf(1.5)
            }
            ForwardModel::Cubic { center } => -6.0 * (x - center),
            ForwardModel::Exponential { base } => {
                let ln_b = base.ln();
                base.powf(x) * ln_b * ln_b
            }
        }
    }
}

impl fmt::Display for ForwardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ForwardModel::Quadratic { scale } => write!(f, "{scale}·x²"),
            ForwardModel::QuarterCircle { radius } => write!(f, "√({radius}² − x²)"),
            ForwardModel::Cubic { center } => write!(f, "−(x − {center})³ − (x − {center})"),
            ForwardModel::Exponential { base } => write!(f, "{base}ˣ"),
        }
    }
}

impl FromStr for ForwardModel {
    type Err = ModelError;

    /// Parse a model name into the model with its default parameters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "quadratic" | "sqr" => Ok(ForwardModel::quadratic()),
            "quarter-circle" | "circle" | "circ" => Ok(ForwardModel::quarter_circle()),
            "cubic" | "poly" => Ok(ForwardModel::cubic()),
            "exponential" | "exp" => Ok(ForwardModel::exponential()),
            _ => Err(ModelError::UnknownModel(s.to_string())),
        }
    }
}
