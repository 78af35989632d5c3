//! Forward-mode automatic differentiation and differentiable forward models.
//!
//! This crate is the modelling half of deltavar: it knows how to evaluate a
//! forward model `f`, the reconstruction loss built on it, and exact first and
//! second derivatives of both. The estimators that consume those derivatives
//! live in `deltavar-optim`.

pub mod api;
pub mod dual;
pub mod error;
pub mod float;
pub mod loss;
pub mod model;
pub mod scalar;
mod traits;

pub use api::{derivative, gradient, hessian, mixed_partials, second_derivative, Dual2};
pub use dual::Dual;
pub use error::ModelError;
pub use float::Float;
pub use loss::{batch_loss, reconstruction_loss};
pub use model::ForwardModel;
pub use scalar::Scalar;

/// Type alias for forward-mode dual numbers over `f64`.
pub type Dual64 = Dual<f64>;
/// Type alias for forward-mode dual numbers over `f32`.
pub type Dual32 = Dual<f32>;
