//! Noisy observation batches `y = f(x_true) + n`, `n ~ Normal(0, Σ_noise)`.

use deltavar::ForwardModel;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::NoiseError;
use crate::linalg::cholesky;

/// Tolerance on `|Σ_ij − Σ_ji|`, relative to the larger magnitude.
const SYMMETRY_TOL: f64 = 1e-12;

/// Known observation-noise covariance `Σ_noise` (`M × M`, symmetric PSD).
///
/// Keeps the lower Cholesky factor so that correlated draws are `L · z`.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseCovariance {
    matrix: Vec<Vec<f64>>,
    factor: Vec<Vec<f64>>,
}

impl NoiseCovariance {
    /// `σ² · I` in `dims` dimensions.
    pub fn isotropic(dims: usize, variance: f64) -> Result<Self, NoiseError> {
        Self::diagonal(&vec![variance; dims])
    }

    /// Independent components with the given variances.
    pub fn diagonal(variances: &[f64]) -> Result<Self, NoiseError> {
        let dims = variances.len();
        let mut matrix = vec![vec![0.0; dims]; dims];
        for (i, &v) in variances.iter().enumerate() {
            matrix[i][i] = v;
        }
        Self::full(matrix)
    }

    /// A general covariance matrix.
    pub fn full(matrix: Vec<Vec<f64>>) -> Result<Self, NoiseError> {
        let dims = matrix.len();
        if dims == 0 {
            return Err(NoiseError::Empty);
        }
        for (row, entries) in matrix.iter().enumerate() {
            if entries.len() != dims {
                return Err(NoiseError::NotSquare {
                    row,
                    len: entries.len(),
                    dims,
                });
            }
            if let Some((col, &value)) = entries.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(NoiseError::NonFinite { row, col, value });
            }
        }
        for row in 0..dims {
            for col in (row + 1)..dims {
                let upper = matrix[row][col];
                let lower = matrix[col][row];
                let scale = upper.abs().max(lower.abs()).max(1.0);
                if (upper - lower).abs() > SYMMETRY_TOL * scale {
                    return Err(NoiseError::Asymmetric {
                        row,
                        col,
                        upper,
                        lower,
                    });
                }
            }
        }

        let trace_scale = (0..dims).fold(0.0_f64, |acc, i| acc.max(matrix[i][i].abs()));
        let factor = cholesky(&matrix, SYMMETRY_TOL * trace_scale.max(1.0))
            .ok_or(NoiseError::NotPositiveSemiDefinite)?;

        Ok(NoiseCovariance { matrix, factor })
    }

    /// Observation dimension `M`.
    pub fn dims(&self) -> usize {
        self.matrix.len()
    }

    pub fn matrix(&self) -> &[Vec<f64>] {
        &self.matrix
    }

    /// Lower Cholesky factor `L` with `Σ = L Lᵀ`.
    pub fn factor(&self) -> &[Vec<f64>] {
        &self.factor
    }

    /// Average per-component variance, `trace(Σ) / M`.
    pub fn mean_variance(&self) -> f64 {
        let trace: f64 = (0..self.dims()).map(|i| self.matrix[i][i]).sum();
        trace / self.dims() as f64
    }

    /// Draw one noise vector into `out`.
    ///
    /// Consumes exactly `M` standard normals from `rng`, in component order.
    pub fn sample_into<R: Rng + ?Sized>(&self, rng: &mut R, out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.dims());
        let z: Vec<f64> = (0..self.dims()).map(|_| rng.sample(StandardNormal)).collect();
        for (row, o) in self.factor.iter().zip(out.iter_mut()) {
            *o = row.iter().zip(z.iter()).map(|(l, zi)| l * zi).sum();
        }
    }
}

/// `N` independent trials of an `M`-dimensional observation.
///
/// Stored trial-major so each trial's observation is one contiguous slice.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationBatch {
    dims: usize,
    values: Vec<f64>,
}

impl ObservationBatch {
    /// Wrap trial-major values; `values.len()` must be a multiple of `dims`.
    pub fn new(dims: usize, values: Vec<f64>) -> Self {
        assert!(dims > 0, "observation dimension must be positive");
        assert_eq!(
            values.len() % dims,
            0,
            "values length ({}) must be a multiple of dims ({})",
            values.len(),
            dims
        );
        ObservationBatch { dims, values }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn trials(&self) -> usize {
        self.values.len() / self.dims
    }

    /// All values, trial-major.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Observation of trial `index`.
    pub fn trial(&self, index: usize) -> &[f64] {
        &self.values[index * self.dims..(index + 1) * self.dims]
    }

    /// Iterate over per-trial observations.
    pub fn iter(&self) -> std::slice::Chunks<'_, f64> {
        self.values.chunks(self.dims)
    }

    /// Smallest and largest observed value, ignoring NaN.
    pub fn range(&self) -> (f64, f64) {
        self.values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Produces noisy observations of a fixed forward model.
#[derive(Debug, Clone)]
pub struct MeasurementGenerator {
    model: ForwardModel,
    noise: NoiseCovariance,
}

impl MeasurementGenerator {
    pub fn new(model: ForwardModel, noise: NoiseCovariance) -> Self {
        MeasurementGenerator { model, noise }
    }

    pub fn model(&self) -> &ForwardModel {
        &self.model
    }

    pub fn noise(&self) -> &NoiseCovariance {
        &self.noise
    }

    /// Draw `trials` independent observations of `x_true`.
    ///
    /// Noise is drawn trial by trial, component by component; an out-of-domain
    /// `x_true` yields NaN observations rather than an error.
    pub fn generate<R: Rng + ?Sized>(&self, x_true: f64, trials: usize, rng: &mut R) -> ObservationBatch {
        let dims = self.noise.dims();
        let fx = self.model.evaluate(x_true);
        let mut values = vec![0.0; dims * trials];
        for trial in values.chunks_mut(dims) {
            self.noise.sample_into(rng, trial);
            trial.iter_mut().for_each(|y| *y += fx);
        }
        log::debug!(
            "generated {trials} trials of {dims}-dimensional observations of f({x_true}) = {fx}"
        );
        ObservationBatch::new(dims, values)
    }
}

/// Independent, reproducible random streams for the two consumers of entropy.
///
/// Both children are derived from one master generator in a fixed order
/// (noise first, then initialisation), so a single seed pins the whole run
/// while the streams never share state.
pub struct RandomStreams {
    pub noise: StdRng,
    pub init: StdRng,
}

impl RandomStreams {
    pub fn from_seed(seed: u64) -> Self {
        let mut master = StdRng::seed_from_u64(seed);
        let noise = StdRng::seed_from_u64(master.next_u64());
        let init = StdRng::seed_from_u64(master.next_u64());
        RandomStreams { noise, init }
    }
}

/// Per-trial initial guesses drawn uniformly from `[low, high)`.
///
/// Panics if `low >= high` or either bound is not finite.
pub fn initial_guess<R: Rng + ?Sized>(trials: usize, low: f64, high: f64, rng: &mut R) -> Vec<f64> {
    assert!(
        low.is_finite() && high.is_finite() && low < high,
        "initial guess range [{low}, {high}) is empty or not finite"
    );
    let dist = Uniform::new(low, high);
    (0..trials).map(|_| dist.sample(rng)).collect()
}
