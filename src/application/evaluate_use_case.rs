// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Reloads a finished run and measures its test cost:
//   1. Read train_config.json from the checkpoint directory
//   2. Regenerate the test split from the saved copy-problem seed
//   3. Rebuild the model and load the saved parameters
//   4. Average the bit-scaled cost over a number of test batches

use anyhow::Result;
use burn::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{evaluator::Evaluator, EvalBackend};

pub struct EvaluateUseCase {
    checkpoint_dir: String,
    batches:        usize,
    batch_size:     Option<usize>,
    seed:           u64,
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: String, batches: usize, batch_size: Option<usize>, seed: u64) -> Self {
        Self { checkpoint_dir, batches, batch_size, seed }
    }

    /// Returns the mean test cost in bits.
    pub fn execute(&self) -> Result<f64> {
        let ckpt = CheckpointManager::new(&self.checkpoint_dir);
        let cfg  = ckpt.load_config()?;
        let test = cfg.copy_problem.test_split()?;

        let device    = <EvalBackend as Backend>::Device::default();
        let evaluator = Evaluator::<EvalBackend>::from_checkpoint(&ckpt, &cfg, &test, device)?;

        let batch_size = self.batch_size.unwrap_or(cfg.batch_size);
        let mut rng    = StdRng::seed_from_u64(self.seed);
        evaluator.evaluate(&test, self.batches, batch_size, &mut rng)
    }
}
