use std::path::PathBuf;
use std::process;

use clap::Parser;
use deltavar::ForwardModel;
use deltavar_optim::{run_experiment, ConfigError, DerivativeSource, ExperimentConfig};

#[derive(Parser)]
#[command(
    name = "deltavar-run",
    about = "Compare Monte Carlo, IFT and Laplace variance estimates for an iterative reconstruction",
    long_about = "Simulates noisy observations of a latent value through a forward model, \
                  reconstructs every trial with Adam, and compares the empirical spread of the \
                  estimates with analytic covariance propagation at one trial."
)]
struct Cli {
    /// TOML experiment configuration; flags below override its fields
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Forward model: quadratic, quarter-circle, cubic or exponential
    #[arg(long)]
    model: Option<ForwardModel>,

    /// True latent value
    #[arg(long, value_name = "X")]
    x_true: Option<f64>,

    /// Number of Monte Carlo trials
    #[arg(long, value_name = "N")]
    trials: Option<usize>,

    /// Observation dimension
    #[arg(long, value_name = "M")]
    dims: Option<usize>,

    /// Isotropic observation-noise variance
    #[arg(long, value_name = "VAR")]
    noise_variance: Option<f64>,

    /// Adam iteration budget
    #[arg(long)]
    iterations: Option<usize>,

    /// Adam learning rate
    #[arg(long, value_name = "LR")]
    learning_rate: Option<f64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Derivative source for the analytic estimates: automatic or closed_form
    #[arg(long)]
    derivatives: Option<DerivativeSource>,
}

impl Cli {
    fn into_config(self) -> Result<ExperimentConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_path(path)?,
            None => ExperimentConfig::default(),
        };
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(x_true) = self.x_true {
            config.x_true = x_true;
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if let Some(dims) = self.dims {
            config.dims = dims;
        }
        if let Some(variance) = self.noise_variance {
            config.noise_variance = variance;
            config.noise_covariance = None;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(lr) = self.learning_rate {
            config.learning_rate = lr;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(source) = self.derivatives {
            config.derivatives = source;
        }
        Ok(config)
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = cli.into_config().and_then(|config| run_experiment(&config));
    match result {
        Ok(report) => print!("{report}"),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
