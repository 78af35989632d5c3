use deltavar::{batch_loss, derivative, reconstruction_loss, Dual64, ForwardModel, Scalar};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::measurement::ObservationBatch;

/// Trait for optimization objectives.
///
/// Implementors provide function evaluation and gradient computation.
/// Methods take `&mut self` to allow caching, eval counting, and internal buffers.
pub trait Objective<F: num_traits::Float> {
    /// Number of input variables.
    fn dim(&self) -> usize;

    /// Evaluate the objective and its gradient at `x`.
    ///
    /// Returns `(f(x), ∇f(x))`.
    fn eval_grad(&mut self, x: &[F]) -> (F, Vec<F>);
}

/// Batch reconstruction loss over every trial of an observation batch.
///
/// The decision vector holds one latent estimate per trial. The objective is
/// the mean of the per-trial losses, so trial `n`'s gradient entry depends
/// only on trial `n`'s data: minimising the batch minimises every trial
/// independently.
pub struct ReconstructionObjective<'a> {
    model: ForwardModel,
    batch: &'a ObservationBatch,
    func_evals: usize,
}

impl<'a> ReconstructionObjective<'a> {
    pub fn new(model: ForwardModel, batch: &'a ObservationBatch) -> Self {
        ReconstructionObjective {
            model,
            batch,
            func_evals: 0,
        }
    }

    /// Number of function evaluations performed so far.
    pub fn func_evals(&self) -> usize {
        self.func_evals
    }

    #[cfg(not(feature = "parallel"))]
    fn trial_derivatives(&self, x: &[f64]) -> Vec<f64> {
        self.batch
            .iter()
            .zip(x.iter())
            .map(|(y, &xi)| trial_derivative(&self.model, y, xi))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn trial_derivatives(&self, x: &[f64]) -> Vec<f64> {
        self.batch
            .values()
            .par_chunks(self.batch.dims())
            .zip(x.par_iter())
            .map(|(y, &xi)| trial_derivative(&self.model, y, xi))
            .collect()
    }
}

impl Objective<f64> for ReconstructionObjective<'_> {
    fn dim(&self) -> usize {
        self.batch.trials()
    }

    fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
        assert_eq!(
            x.len(),
            self.batch.trials(),
            "estimate count ({}) must equal trial count ({})",
            x.len(),
            self.batch.trials()
        );
        self.func_evals += 1;

        let value = batch_loss(&self.model, self.batch.values(), self.batch.dims(), x);
        let n = x.len() as f64;
        let grad = self.trial_derivatives(x).into_iter().map(|d| d / n).collect();
        (value, grad)
    }
}

/// Derivative of one trial's loss in its latent estimate.
fn trial_derivative(model: &ForwardModel, y: &[f64], x: f64) -> f64 {
    let y: Vec<Dual64> = y.iter().map(|&v| Dual64::from_f(v)).collect();
    derivative(|xd| reconstruction_loss(model, &y, xd), x).1
}
