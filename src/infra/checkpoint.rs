// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the RWA parameters with Burn's
// NamedMpkFileRecorder at full precision.
//
// What gets saved:
//   1. Model weights (train.mpk) — every parameter by field name
//   2. train_config.json         — the run's TrainConfig, so the
//                                  model (and the test split) can
//                                  be rebuilt before loading
//
// Full precision matters: CompactRecorder stores f16, which
// would make a reloaded model compute different outputs.
//
// File layout (overwritten on every run, no versioning):
//   bin/
//     train.mpk
//     train_config.json
//     metrics.csv          ← written by MetricsLogger
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::RwaModel;

/// Base name of the weights file; the recorder adds the extension.
const CHECKPOINT_NAME: &str = "train";
const CONFIG_NAME: &str = "train_config.json";

type WeightsRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Manages saving and loading of the trained parameters.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Point at a checkpoint directory without touching the filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding `train.mpk` and `train_config.json`.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the checkpoint directory (and parents) if it is missing.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))
    }

    fn weights_path(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_NAME)
    }

    /// Write every parameter tensor to `{dir}/train.mpk`, replacing any
    /// previous checkpoint.
    pub fn save_model<B: Backend>(&self, model: &RwaModel<B>) -> Result<()> {
        self.ensure_dir()?;
        let path = self.weights_path();

        WeightsRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::info!("Saved checkpoint to '{}'", path.display());
        Ok(())
    }

    /// Load the saved parameters into `model`, which must have been built
    /// with the same architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  RwaModel<B>,
        device: &B::Device,
    ) -> Result<RwaModel<B>> {
        let path = self.weights_path();

        let record = WeightsRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Save the run configuration next to the weights as
    /// `{dir}/train_config.json`.
    ///
    /// `evaluate` reads this back to rebuild the same architecture and
    /// regenerate the same test split, so it is written before training
    /// starts. An existing file is replaced.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(CONFIG_NAME);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Read `{dir}/train_config.json` back into a `TrainConfig`.
    ///
    /// Fails with a hint to run `train` first when the file is missing,
    /// and with the file path when the JSON does not parse.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_NAME);

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'evaluate'.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }
}
