use std::path::PathBuf;

use deltavar::ModelError;
use thiserror::Error;

/// Invalid noise covariance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoiseError {
    #[error("noise covariance must have at least one dimension")]
    Empty,

    #[error("noise covariance row {row} has {len} entries, expected {dims}")]
    NotSquare { row: usize, len: usize, dims: usize },

    #[error("noise covariance entry ({row}, {col}) is not finite: {value}")]
    NonFinite { row: usize, col: usize, value: f64 },

    #[error("noise covariance is not symmetric at ({row}, {col}): {upper} vs {lower}")]
    Asymmetric {
        row: usize,
        col: usize,
        upper: f64,
        lower: f64,
    },

    #[error("noise covariance is not positive semi-definite")]
    NotPositiveSemiDefinite,
}

/// Why the analytic propagator could not produce a covariance.
///
/// These are precondition failures at the operating point; the Monte Carlo
/// estimate of the same run is unaffected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropagationError {
    #[error("operating point has {found} observation dimensions, noise covariance has {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("latent estimate {x} is outside the domain of the {model} model")]
    DomainViolation { model: &'static str, x: f64 },

    #[error("observation component {index} is not finite: {value}")]
    NonFiniteObservation { index: usize, value: f64 },

    #[error("loss Hessian {hessian:?} is unusable at the operating point: {reason}")]
    SingularCurvature {
        hessian: Vec<Vec<f64>>,
        reason: &'static str,
    },
}

/// Invalid or unreadable experiment configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Noise(#[from] NoiseError),
}
