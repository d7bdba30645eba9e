use anyhow::{bail, Result};
use rand::{Rng, RngCore};

use crate::domain::batch::{SequenceBatch, SequenceExample};
use crate::domain::traits::BatchSource;

/// A fixed-size, in-memory split of labelled sequences.
/// Batches are drawn uniformly with replacement.
pub struct SequenceDataset {
    name:         String,
    examples:     Vec<SequenceExample>,
    num_features: usize,
    max_steps:    usize,
    num_classes:  usize,
}

impl SequenceDataset {
    pub fn new(
        name:         impl Into<String>,
        examples:     Vec<SequenceExample>,
        num_features: usize,
        max_steps:    usize,
        num_classes:  usize,
    ) -> Result<Self> {
        let name = name.into();
        if examples.is_empty() {
            bail!("split '{name}' has no examples");
        }
        for (i, ex) in examples.iter().enumerate() {
            if ex.features.len() != max_steps * num_features || ex.labels.len() != max_steps {
                bail!("split '{name}': example {i} does not match {max_steps} steps x {num_features} features");
            }
        }
        Ok(Self { name, examples, num_features, max_steps, num_classes })
    }
}

impl BatchSource for SequenceDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_features(&self) -> usize { self.num_features }

    fn max_steps(&self) -> usize { self.max_steps }

    fn num_classes(&self) -> usize { self.num_classes }

    fn num_examples(&self) -> usize { self.examples.len() }

    fn batch(&self, size: usize, rng: &mut dyn RngCore) -> Result<SequenceBatch> {
        let picked: Vec<SequenceExample> = (0..size)
            .map(|_| self.examples[rng.gen_range(0..self.examples.len())].clone())
            .collect();
        SequenceBatch::from_examples(&picked, self.max_steps, self.num_features, self.num_classes)
    }
}
