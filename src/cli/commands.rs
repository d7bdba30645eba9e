// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands: `train` and `evaluate`.
//
// Every `train` flag defaults to the reference run's constants,
// so `rwa-trainer train` with no flags trains a 250-cell RWA on
// the 100-step copy problem for 50,000 iterations.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::data::copy_problem::CopyProblemConfig;
use crate::ml::model::Activation;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the RWA model and save its parameters
    Train(TrainArgs),

    /// Reload a saved model and report its test cost
    Evaluate(EvaluateArgs),
}

/// Hidden-state nonlinearity, as spelled on the command line
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ActivationArg {
    Tanh,
    Sigmoid,
    Relu,
    Identity,
}

impl From<ActivationArg> for Activation {
    fn from(a: ActivationArg) -> Self {
        match a {
            ActivationArg::Tanh     => Activation::Tanh,
            ActivationArg::Sigmoid  => Activation::Sigmoid,
            ActivationArg::Relu     => Activation::Relu,
            ActivationArg::Identity => Activation::Identity,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory for the checkpoint, its config and metrics.csv
    #[arg(long, default_value = "bin")]
    pub checkpoint_dir: String,

    /// Width of the RWA cell
    #[arg(long, default_value_t = 250)]
    pub num_cells: usize,

    #[arg(long, value_enum, default_value_t = ActivationArg::Tanh)]
    pub activation: ActivationArg,

    /// Scales the variance of the random initializers
    #[arg(long, default_value_t = 1.0)]
    pub initialization_factor: f64,

    #[arg(long, default_value_t = 50_000)]
    pub num_iterations: usize,

    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,

    /// Evaluate on a test batch every N iterations
    #[arg(long, default_value_t = 100)]
    pub eval_every: usize,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Distinct symbols in a copy pattern
    #[arg(long, default_value_t = 8)]
    pub num_symbols: usize,

    /// Symbols to memorise and recall
    #[arg(long, default_value_t = 10)]
    pub pattern_length: usize,

    /// Steps between the pattern and its recall
    #[arg(long, default_value_t = 100)]
    pub delay: usize,

    #[arg(long, default_value_t = 10_000)]
    pub num_train: usize,

    #[arg(long, default_value_t = 1_000)]
    pub num_test: usize,

    /// Seed for generating the dataset
    #[arg(long, default_value_t = 1)]
    pub data_seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            checkpoint_dir:        a.checkpoint_dir,
            num_cells:             a.num_cells,
            activation:            a.activation.into(),
            initialization_factor: a.initialization_factor,
            num_iterations:        a.num_iterations,
            batch_size:            a.batch_size,
            learning_rate:         a.learning_rate,
            eval_every:            a.eval_every,
            seed:                  a.seed,
            copy_problem: CopyProblemConfig {
                num_symbols:    a.num_symbols,
                pattern_length: a.pattern_length,
                delay:          a.delay,
                num_train:      a.num_train,
                num_test:       a.num_test,
                seed:           a.data_seed,
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory a previous `train` run wrote to
    #[arg(long, default_value = "bin")]
    pub checkpoint_dir: String,

    /// Number of test batches to average over
    #[arg(long, default_value_t = 10)]
    pub batches: usize,

    /// Defaults to the batch size used for training
    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_equal_config_defaults() {
        let cli = Cli::try_parse_from(["rwa-trainer", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        let defaults = TrainConfig::default();
        assert_eq!(cfg.num_cells, defaults.num_cells);
        assert_eq!(cfg.num_iterations, defaults.num_iterations);
        assert_eq!(cfg.batch_size, defaults.batch_size);
        assert_eq!(cfg.eval_every, defaults.eval_every);
        assert_eq!(cfg.activation, defaults.activation);
        assert_eq!(cfg.checkpoint_dir, defaults.checkpoint_dir);
        assert_eq!(cfg.copy_problem.max_steps(), defaults.copy_problem.max_steps());
        assert_eq!(cfg.copy_problem.seed, defaults.copy_problem.seed);
    }

    #[test]
    fn test_train_flags_override() {
        let cli = Cli::try_parse_from([
            "rwa-trainer", "train", "--num-cells", "16", "--activation", "relu", "--delay", "5",
        ]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.num_cells, 16);
        assert_eq!(cfg.activation, Activation::Relu);
        assert_eq!(cfg.copy_problem.delay, 5);
    }

    #[test]
    fn test_evaluate_args() {
        let cli = Cli::try_parse_from(["rwa-trainer", "evaluate", "--batches", "3"]).unwrap();
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        assert_eq!(args.batches, 3);
        assert_eq!(args.batch_size, None);
        assert_eq!(args.checkpoint_dir, "bin");
    }
}
