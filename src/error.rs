use thiserror::Error;

/// Invalid forward-model parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A parameter must be finite.
    #[error("{model} parameter `{name}` must be finite, got {value}")]
    NonFiniteParameter {
        model: &'static str,
        name: &'static str,
        value: f64,
    },

    /// A parameter is outside its admissible range.
    #[error("{model} parameter `{name}` = {value} is invalid: {reason}")]
    InvalidParameter {
        model: &'static str,
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Unrecognised model name.
    #[error("unknown forward model `{0}` (expected quadratic, quarter-circle, cubic or exponential)")]
    UnknownModel(String),
}
