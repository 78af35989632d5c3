//! End-to-end uncertainty experiment: simulate, reconstruct, propagate, compare.

use std::fmt;
use std::path::Path;

use deltavar::ForwardModel;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::compare::{Comparison, MonteCarloSummary};
use crate::error::{ConfigError, NoiseError, PropagationError};
use crate::implicit::{analytic_estimates, AnalyticEstimates, DerivativeSource, OperatingPoint};
use crate::measurement::{initial_guess, MeasurementGenerator, NoiseCovariance, ObservationBatch, RandomStreams};
use crate::objective::ReconstructionObjective;
use crate::result::OptimResult;
use crate::solvers::adam::{adam, AdamConfig};

/// Run-time configuration of one experiment.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
/// The defaults reproduce the reference scenario: quadratic `10·x²` at
/// `x_true = 5` with 2000 trials of variance-20 noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub model: ForwardModel,
    pub x_true: f64,
    /// Monte Carlo trial count `N`.
    pub trials: usize,
    /// Observation dimension `M`.
    pub dims: usize,
    /// Isotropic noise variance `σ²`, ignored when `noise_covariance` is set.
    pub noise_variance: f64,
    pub noise_covariance: Option<Vec<Vec<f64>>>,
    pub iterations: usize,
    pub learning_rate: f64,
    pub seed: u64,
    /// Half-open interval for the uniform initial guesses.
    pub init_range: (f64, f64),
    pub derivatives: DerivativeSource,
    /// Trial whose estimate is used as the analytic operating point.
    pub representative_trial: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            model: ForwardModel::quadratic(),
            x_true: 5.0,
            trials: 2000,
            dims: 1,
            noise_variance: 20.0,
            noise_covariance: None,
            iterations: 200,
            learning_rate: 1.0,
            seed: 4,
            init_range: (0.0, 1.0),
            derivatives: DerivativeSource::Automatic,
            representative_trial: 0,
        }
    }
}

impl ExperimentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        self.model.validate()?;
        if !self.x_true.is_finite() {
            return Err(invalid("x_true", format!("must be finite, got {}", self.x_true)));
        }
        if self.trials == 0 {
            return Err(invalid("trials", "must be at least 1"));
        }
        if self.dims == 0 {
            return Err(invalid("dims", "must be at least 1"));
        }
        if self.iterations == 0 {
            return Err(invalid("iterations", "must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid(
                "learning_rate",
                format!("must be positive and finite, got {}", self.learning_rate),
            ));
        }
        let (low, high) = self.init_range;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(invalid(
                "init_range",
                format!("must be a finite, non-empty interval, got [{low}, {high})"),
            ));
        }
        if self.representative_trial >= self.trials {
            return Err(invalid(
                "representative_trial",
                format!("{} is out of range for {} trials", self.representative_trial, self.trials),
            ));
        }
        match &self.noise_covariance {
            Some(matrix) if matrix.len() != self.dims => {
                return Err(invalid(
                    "noise_covariance",
                    format!("has {} rows, expected dims = {}", matrix.len(), self.dims),
                ));
            }
            Some(_) => {}
            None => {
                if !(self.noise_variance.is_finite() && self.noise_variance > 0.0) {
                    return Err(invalid(
                        "noise_variance",
                        format!("must be positive and finite, got {}", self.noise_variance),
                    ));
                }
            }
        }
        self.noise()?;
        Ok(())
    }

    /// The observation-noise covariance this config describes.
    pub fn noise(&self) -> Result<NoiseCovariance, NoiseError> {
        match &self.noise_covariance {
            Some(matrix) => NoiseCovariance::full(matrix.clone()),
            None => NoiseCovariance::isotropic(self.dims, self.noise_variance),
        }
    }

    pub fn adam(&self) -> AdamConfig<f64> {
        AdamConfig {
            iterations: self.iterations,
            learning_rate: self.learning_rate,
            ..AdamConfig::default()
        }
    }
}

/// Everything one experiment produced.
#[derive(Debug, Clone)]
pub struct Report {
    pub config: ExperimentConfig,
    pub observations: ObservationBatch,
    pub reconstruction: OptimResult<f64>,
    pub monte_carlo: MonteCarloSummary,
    /// `(x̂₀, y₀)` of the representative trial.
    pub representative: OperatingPoint,
    /// `f'(x̂₀)`, the local slope of the forward model.
    pub slope: f64,
    pub analytic: Result<AnalyticEstimates, PropagationError>,
    /// Present only when the analytic estimates are.
    pub comparison: Option<Comparison>,
}

impl Report {
    pub fn loss_history(&self) -> &[f64] {
        &self.reconstruction.loss_history
    }

    pub fn estimates(&self) -> &[f64] {
        &self.reconstruction.x
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mc = &self.monte_carlo;
        writeln!(
            f,
            "model: {}  x_true: {}  trials: {}  dims: {}",
            self.config.model, self.config.x_true, mc.trials, self.config.dims
        )?;
        if let Some(loss) = self.reconstruction.final_loss() {
            writeln!(f, "final loss: {loss:.6e}  |grad|: {:.3e}", self.reconstruction.gradient_norm)?;
        }
        writeln!(f, "MC iterative mean: {}", mc.mean)?;
        if mc.non_finite > 0 {
            writeln!(f, "non-finite estimates: {}", mc.non_finite)?;
        }
        writeln!(f)?;
        writeln!(f, "--- x̂ uncertainty ---")?;
        writeln!(f, "             MC iterative σ²: {:.3e}", mc.variance)?;

        let analytic = match &self.analytic {
            Ok(analytic) => analytic,
            Err(e) => return writeln!(f, "analytic estimates unavailable: {e}"),
        };
        writeln!(f, "                      IFT σ²: {:.3e}", analytic.ift_variance())?;
        writeln!(f, "   Laplace (full formula) σ²: {:.3e}", analytic.laplace_variance())?;
        writeln!(f, "Laplace (simple H⁻¹ only) σ²: {:.3e}", analytic.laplace_simple_variance())?;

        if let Some(c) = &self.comparison {
            writeln!(f)?;
            writeln!(f, "error vs MC:")?;
            writeln!(f, "  IFT:              {:+.2}%", c.ift_vs_mc)?;
            writeln!(f, "  Laplace (full):   {:+.2}%", c.laplace_vs_mc)?;
            writeln!(f, "  Laplace (simple): {:+.2}%", c.laplace_simple_vs_mc)?;
            writeln!(f)?;
            writeln!(f, "IFT vs Laplace (full) difference: {:+.2}%", c.ift_vs_laplace)?;
        }
        Ok(())
    }
}

/// Run one full experiment.
///
/// Only configuration problems are errors. A failure of the analytic
/// propagator is recorded in [`Report::analytic`] and the Monte Carlo
/// statistics are still returned.
pub fn run_experiment(config: &ExperimentConfig) -> Result<Report, ConfigError> {
    config.validate()?;
    let noise = config.noise()?;
    let model = config.model;
    let mut streams = RandomStreams::from_seed(config.seed);

    let generator = MeasurementGenerator::new(model, noise);
    let observations = generator.generate(config.x_true, config.trials, &mut streams.noise);
    let (low, high) = config.init_range;
    let x0 = initial_guess(config.trials, low, high, &mut streams.init);

    info!(
        "reconstructing {} trials of the {} model with Adam ({} iterations, lr = {})",
        config.trials, model, config.iterations, config.learning_rate
    );
    let mut objective = ReconstructionObjective::new(model, &observations);
    let reconstruction = adam(&mut objective, &x0, &config.adam());

    let monte_carlo = MonteCarloSummary::from_estimates(&reconstruction.x);
    if monte_carlo.non_finite > 0 {
        warn!(
            "{} of {} estimates are not finite",
            monte_carlo.non_finite, monte_carlo.trials
        );
    }
    info!(
        "Monte Carlo: mean = {}, variance = {:e}",
        monte_carlo.mean, monte_carlo.variance
    );

    let k = config.representative_trial;
    let representative = OperatingPoint::new(reconstruction.x[k], observations.trial(k));
    let slope = model.derivative(representative.x);
    let analytic = analytic_estimates(&model, &representative, generator.noise(), config.derivatives);

    let comparison = match &analytic {
        Ok(estimates) => {
            info!(
                "IFT variance = {:e}, Laplace = {:e}, naive Laplace = {:e}",
                estimates.ift_variance(),
                estimates.laplace_variance(),
                estimates.laplace_simple_variance()
            );
            Some(Comparison::new(estimates, &monte_carlo))
        }
        Err(e) => {
            warn!("analytic propagation failed: {e}");
            None
        }
    };

    Ok(Report {
        config: config.clone(),
        observations,
        reconstruction,
        monte_carlo,
        representative,
        slope,
        analytic,
        comparison,
    })
}
