// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records every reported cost to a CSV file, one row per
// train iteration and one per evaluation.
//
// Output file: bin/metrics.csv (recreated at the start of each run)
//
// Example CSV output:
//   iteration,dataset,cost_bits
//   0,train,3.169925
//   0,test,3.168811
//   1,train,3.141002
//   ...
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

/// One reported cost.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationMetrics {
    pub iteration: usize,

    /// Which split the batch came from ("train" or "test")
    pub dataset: String,

    /// Mean per-step cross-entropy in bits
    pub cost_bits: f64,
}

impl IterationMetrics {
    pub fn new(iteration: usize, dataset: impl Into<String>, cost_bits: f64) -> Self {
        Self { iteration, dataset: dataset.into(), cost_bits }
    }
}

/// Appends cost rows to a CSV file for later plotting.
pub struct MetricsLogger {
    csv_path: PathBuf,
    file:     File,
}

impl MetricsLogger {
    /// Start a fresh metrics file in `dir`, replacing any previous run's.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut file = File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(file, "iteration,dataset,cost_bits")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path, file })
    }

    /// Append one row; the cost is written with six decimals.
    pub fn log(&mut self, m: &IterationMetrics) -> Result<()> {
        writeln!(self.file, "{},{},{:.6}", m.iteration, m.dataset, m.cost_bits)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
