// ============================================================
// Layer 3 — Sequence Batch Domain Types
// ============================================================
// Plain-Rust representation of the data the trainer consumes.
//
// A SequenceExample is one labelled sequence:
//   - features: one vector per time step, flattened row-major
//               [max_steps * num_features]
//   - labels:   one class index per time step [max_steps]
//   - length:   how many leading steps are real (not padding)
//
// A SequenceBatch is a fixed-size stack of examples, expanded
// into the three aligned arrays the model is fed with:
//
//   features  [batch, max_steps, num_features]   (f32)
//   lengths   [batch]                            (f32)
//   labels    [batch, max_steps, num_classes]    (one-hot f32)
//
// Batches are produced fresh by a BatchSource and consumed
// immediately by the batcher; nothing here keeps them around.

use anyhow::{bail, Result};

/// One labelled sequence, stored compactly (labels as class indices).
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceExample {
    /// Flattened [max_steps * num_features] feature values
    pub features: Vec<f32>,

    /// Class index for every time step, padding steps included
    pub labels: Vec<usize>,

    /// Number of real (non-padding) steps, in 1..=max_steps
    pub length: usize,
}

impl SequenceExample {
    pub fn new(features: Vec<f32>, labels: Vec<usize>, length: usize) -> Self {
        Self { features, labels, length }
    }
}

/// The three aligned arrays of one mini-batch, plus their dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceBatch {
    pub batch_size:   usize,
    pub max_steps:    usize,
    pub num_features: usize,
    pub num_classes:  usize,

    /// [batch_size * max_steps * num_features], row-major
    pub features: Vec<f32>,

    /// [batch_size] valid lengths, kept as floats because the cost
    /// divides by them
    pub lengths: Vec<f32>,

    /// [batch_size * max_steps * num_classes], one-hot per step
    pub labels: Vec<f32>,
}

impl SequenceBatch {
    /// Stack examples into a batch, expanding the label indices to one-hot rows.
    pub fn from_examples(
        examples:     &[SequenceExample],
        max_steps:    usize,
        num_features: usize,
        num_classes:  usize,
    ) -> Result<Self> {
        let batch_size = examples.len();
        let mut features = Vec::with_capacity(batch_size * max_steps * num_features);
        let mut lengths  = Vec::with_capacity(batch_size);
        let mut labels   = vec![0.0f32; batch_size * max_steps * num_classes];

        for (b, ex) in examples.iter().enumerate() {
            if ex.features.len() != max_steps * num_features || ex.labels.len() != max_steps {
                bail!(
                    "example {b} has {} feature values and {} labels, expected {} and {}",
                    ex.features.len(),
                    ex.labels.len(),
                    max_steps * num_features,
                    max_steps,
                );
            }
            features.extend_from_slice(&ex.features);
            lengths.push(ex.length as f32);

            for (t, &class) in ex.labels.iter().enumerate() {
                if class >= num_classes {
                    bail!("example {b} step {t}: class {class} out of range 0..{num_classes}");
                }
                labels[(b * max_steps + t) * num_classes + class] = 1.0;
            }
        }

        let batch = Self {
            batch_size,
            max_steps,
            num_features,
            num_classes,
            features,
            lengths,
            labels,
        };
        batch.validate()?;
        Ok(batch)
    }

    /// Check the shape invariants every consumer relies on.
    ///
    /// Any violation here is fatal for the run: the trainer has no way
    /// to recover from a data source that hands it malformed batches.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch is empty");
        }
        let expect_features = self.batch_size * self.max_steps * self.num_features;
        if self.features.len() != expect_features {
            bail!(
                "features hold {} values, expected {} ({}x{}x{})",
                self.features.len(), expect_features,
                self.batch_size, self.max_steps, self.num_features,
            );
        }
        if self.lengths.len() != self.batch_size {
            bail!("{} lengths for a batch of {}", self.lengths.len(), self.batch_size);
        }
        let expect_labels = self.batch_size * self.max_steps * self.num_classes;
        if self.labels.len() != expect_labels {
            bail!(
                "labels hold {} values, expected {} ({}x{}x{})",
                self.labels.len(), expect_labels,
                self.batch_size, self.max_steps, self.num_classes,
            );
        }

        for (b, &len) in self.lengths.iter().enumerate() {
            // A zero length would divide the accumulated error by zero.
            if !(len >= 1.0 && len <= self.max_steps as f32) || len.fract() != 0.0 {
                bail!("example {b}: valid length {len} outside 1..={}", self.max_steps);
            }
        }

        for (row, chunk) in self.labels.chunks(self.num_classes).enumerate() {
            let hot  = chunk.iter().filter(|&&v| v == 1.0).count();
            let cold = chunk.iter().filter(|&&v| v == 0.0).count();
            if hot != 1 || cold != self.num_classes - 1 {
                bail!(
                    "label row {} (example {}, step {}) is not one-hot",
                    row, row / self.max_steps, row % self.max_steps,
                );
            }
        }
        Ok(())
    }
}
