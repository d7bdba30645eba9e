// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Forward-only cost on a plain (non-autodiff) backend. Used by
// the trainer for its periodic test batches and by the
// `evaluate` command after reloading a checkpoint.

use anyhow::{anyhow, bail, Result};
use burn::prelude::*;
use rand::RngCore;

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::RwaBatcher;
use crate::domain::{batch::SequenceBatch, traits::BatchSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{to_bits, RwaModel};

pub struct Evaluator<B: Backend> {
    model:   RwaModel<B>,
    batcher: RwaBatcher<B>,
}

impl<B: Backend> Evaluator<B> {
    pub fn new(model: RwaModel<B>, device: B::Device) -> Self {
        Self { model, batcher: RwaBatcher::new(device) }
    }

    /// Rebuild the architecture recorded in the checkpoint directory for
    /// `source`'s dimensions and load the saved parameters into it.
    pub fn from_checkpoint(
        ckpt:   &CheckpointManager,
        cfg:    &TrainConfig,
        source: &dyn BatchSource,
        device: B::Device,
    ) -> Result<Self> {
        let model_cfg = cfg.model_config(source.num_features(), source.num_classes());
        let model     = model_cfg.init::<B>(&device, cfg.seed)?;
        let model     = ckpt.load_model(model, &device)?;
        tracing::info!(
            "Model loaded from '{}' ({} cells)",
            ckpt.dir().display(), model.num_cells(),
        );
        Ok(Self::new(model, device))
    }

    /// Bit-scaled mean cost of one batch. Parameters are not touched.
    ///
    /// Fails if any example's accumulated error is not finite, naming the
    /// first such example so a bad input row can be traced back.
    pub fn cost_bits(&self, batch: &SequenceBatch) -> Result<f64> {
        let output = self.model.forward(&self.batcher.batch(batch));

        let errors = output.error
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read per-example error: {e:?}"))?;
        if let Some(i) = errors.iter().position(|e| !e.is_finite()) {
            bail!("evaluation error of example {i} is not finite ({})", errors[i]);
        }

        let cost: f64 = output.cost.into_scalar().elem::<f64>();
        Ok(to_bits(cost))
    }

    /// Average bit-scaled cost over `batches` batches drawn from `source`.
    pub fn evaluate(
        &self,
        source:     &dyn BatchSource,
        batches:    usize,
        batch_size: usize,
        rng:        &mut dyn RngCore,
    ) -> Result<f64> {
        if batches == 0 {
            bail!("need at least one batch to evaluate");
        }
        let mut total = 0.0;
        for _ in 0..batches {
            total += self.cost_bits(&source.batch(batch_size, rng)?)?;
        }
        Ok(total / batches as f64)
    }
}
