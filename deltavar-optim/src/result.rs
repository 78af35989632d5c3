use std::fmt;

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimResult<F> {
    /// Solution point.
    pub x: Vec<F>,
    /// Objective value at every iterate, recorded before each update.
    pub loss_history: Vec<F>,
    /// Norm of the gradient at the last evaluated iterate.
    pub gradient_norm: F,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Total number of objective function evaluations.
    pub func_evals: usize,
    /// Reason for termination.
    pub termination: TerminationReason,
}

impl<F: num_traits::Float> OptimResult<F> {
    /// Last recorded objective value.
    pub fn final_loss(&self) -> Option<F> {
        self.loss_history.last().copied()
    }

    /// Number of solution components that are NaN or infinite.
    pub fn non_finite(&self) -> usize {
        self.x.iter().filter(|v| !v.is_finite()).count()
    }
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Ran the full iteration budget.
    MaxIterations,
    /// Rejected the configuration without iterating.
    InvalidConfig,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::MaxIterations => write!(f, "iteration budget exhausted"),
            TerminationReason::InvalidConfig => write!(f, "invalid solver configuration"),
        }
    }
}
