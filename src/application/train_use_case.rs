// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Validate the configuration
//   Step 2: Generate the train / test splits   (Layer 4 - data)
//   Step 3: Save config beside the checkpoint  (Layer 6 - infra)
//   Step 4: Open the metrics CSV               (Layer 6 - infra)
//   Step 5: Run the training loop              (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::copy_problem::CopyProblemConfig;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    model::{Activation, RwaConfig},
    trainer::run_training,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved as JSON next to the
// checkpoint so `evaluate` can rebuild the model and the test split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Where `train.mpk`, `train_config.json` and `metrics.csv` are
    /// written; created if missing
    pub checkpoint_dir:        String,

    /// Width of the recurrent state (hidden, numerator, denominator)
    pub num_cells:             usize,

    /// Nonlinearity applied to the running average to form the hidden state
    pub activation:            Activation,

    /// Scales the variance of every random initializer
    pub initialization_factor: f64,

    /// Number of Adam updates; there is no early stopping
    pub num_iterations:        usize,

    /// Examples per train and per test batch
    pub batch_size:            usize,

    /// Fixed Adam step size; no schedule is applied
    pub learning_rate:         f64,

    /// Run a test batch every this many iterations (iteration 0 included)
    pub eval_every:            usize,

    /// Seeds parameter initialization and batch sampling
    pub seed:                  u64,

    /// Shape and size of the generated copy-problem splits
    pub copy_problem:          CopyProblemConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir:        "bin".to_string(),
            num_cells:             250,
            activation:            Activation::Tanh,
            initialization_factor: 1.0,
            num_iterations:        50_000,
            batch_size:            100,
            learning_rate:         0.001,
            eval_every:            100,
            seed:                  0,
            copy_problem:          CopyProblemConfig::default(),
        }
    }
}

impl TrainConfig {
    /// Reject settings that would make the run meaningless: an empty state,
    /// empty batches, a zero evaluation interval or a non-positive step size.
    pub fn validate(&self) -> Result<()> {
        if self.num_cells == 0 {
            bail!("num_cells must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.eval_every == 0 {
            bail!("eval_every must be at least 1");
        }
        if !(self.learning_rate > 0.0) {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        Ok(())
    }

    /// Model architecture for a dataset with the given dimensions.
    pub fn model_config(&self, num_features: usize, num_classes: usize) -> RwaConfig {
        RwaConfig::new(num_features, self.num_cells, num_classes)
            .with_initialization_factor(self.initialization_factor)
            .with_activation(self.activation)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Fail before spending time on data generation ──────────────
        cfg.validate()?;

        // ── Step 2: Build the splits ──────────────────────────────────────────
        let (train, test) = cfg.copy_problem.build()?;

        // ── Step 3: Save config for evaluation ────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save_config(cfg)?;

        // ── Step 4: Fresh metrics file ────────────────────────────────────────
        let mut metrics = MetricsLogger::create(&cfg.checkpoint_dir)?;

        // ── Step 5: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, &train, &test, &ckpt, &mut metrics)
    }
}
