//! Variance estimation for iterative reconstructions.
//!
//! Simulates noisy observations of a latent scalar through a forward model,
//! reconstructs every trial with batched Adam, and compares the Monte Carlo
//! spread of the estimates against implicit-function-theorem and Laplace
//! approximations evaluated at one representative trial.

pub mod compare;
pub mod error;
pub mod experiment;
pub mod implicit;
pub mod laplace;
pub mod linalg;
pub mod measurement;
pub mod objective;
pub mod result;
pub mod solvers;

pub use compare::{percent_difference, relative_error_pct, Comparison, MonteCarloSummary};
pub use error::{ConfigError, NoiseError, PropagationError};
pub use experiment::{run_experiment, ExperimentConfig, Report};
pub use implicit::{
    analytic_estimates, loss_derivatives, propagate_covariance, retrieval_jacobian,
    AnalyticEstimates, DerivativeSource, LossDerivatives, OperatingPoint,
};
pub use measurement::{initial_guess, MeasurementGenerator, NoiseCovariance, ObservationBatch, RandomStreams};
pub use objective::{Objective, ReconstructionObjective};
pub use result::{OptimResult, TerminationReason};
pub use solvers::adam::{adam, AdamConfig};
