// ============================================================
// Layer 4 — Copy Problem Generator
// ============================================================
// The delayed copy task: the network sees a short random
// pattern, waits through a long stretch of blanks, and must
// then reproduce the pattern after a delimiter.
//
// Layout of one example (pattern_length = 3, delay = 4):
//
//   step      0  1  2  3  4  5  6  7  8  9
//   input     a  b  c  _  _  _  #  _  _  _
//   target    _  _  _  _  _  _  _  a  b  c
//
//   _ = blank, # = delimiter (last step of the delay)
//
// Input features are one-hot over [symbols.., blank, delimiter],
// targets are one-hot over [symbols.., blank]. Every example is
// exactly max_steps = 2 * pattern_length + delay long, so all
// valid lengths equal max_steps.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::dataset::SequenceDataset;
use crate::domain::batch::SequenceExample;
use crate::domain::traits::BatchSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyProblemConfig {
    /// Distinct symbols a pattern is drawn from
    pub num_symbols: usize,

    /// Symbols shown, then recalled
    pub pattern_length: usize,

    /// Steps between the end of the pattern and the start of recall,
    /// the delimiter included
    pub delay: usize,

    pub num_train: usize,
    pub num_test:  usize,
    pub seed:      u64,
}

impl Default for CopyProblemConfig {
    fn default() -> Self {
        Self {
            num_symbols:    8,
            pattern_length: 10,
            delay:          100,
            num_train:      10_000,
            num_test:       1_000,
            seed:           1,
        }
    }
}

impl CopyProblemConfig {
    pub fn num_features(&self) -> usize { self.num_symbols + 2 }

    pub fn num_classes(&self) -> usize { self.num_symbols + 1 }

    pub fn max_steps(&self) -> usize { 2 * self.pattern_length + self.delay }

    fn blank_input(&self) -> usize { self.num_symbols }

    fn delimiter_input(&self) -> usize { self.num_symbols + 1 }

    fn blank_class(&self) -> usize { self.num_symbols }

    /// Generate one example from the given RNG.
    pub fn example(&self, rng: &mut impl Rng) -> SequenceExample {
        let steps = self.max_steps();
        let width = self.num_features();
        let pattern: Vec<usize> = (0..self.pattern_length)
            .map(|_| rng.gen_range(0..self.num_symbols))
            .collect();

        let recall_start = self.pattern_length + self.delay;
        let mut features = vec![0.0f32; steps * width];
        let mut labels   = vec![self.blank_class(); steps];

        for t in 0..steps {
            let input = if t < self.pattern_length {
                pattern[t]
            } else if t == recall_start - 1 {
                self.delimiter_input()
            } else {
                self.blank_input()
            };
            features[t * width + input] = 1.0;

            if t >= recall_start {
                labels[t] = pattern[t - recall_start];
            }
        }

        SequenceExample::new(features, labels, steps)
    }

    fn validate(&self) -> Result<()> {
        if self.num_symbols == 0 || self.pattern_length == 0 {
            bail!("copy problem needs at least one symbol and a non-empty pattern");
        }
        if self.delay == 0 {
            bail!("copy problem delay must leave room for the delimiter");
        }
        Ok(())
    }

    /// Build the train and test splits, each from its own seeded RNG.
    pub fn build(&self) -> Result<(SequenceDataset, SequenceDataset)> {
        self.validate()?;
        let train = self.split("train", self.num_train, self.seed)?;
        let test  = self.test_split()?;
        tracing::info!(
            "Copy problem: {} symbols, pattern {}, delay {} → {} steps; {} train / {} test",
            self.num_symbols, self.pattern_length, self.delay,
            self.max_steps(), train.num_examples(), test.num_examples(),
        );
        Ok((train, test))
    }

    /// Build only the test split.
    ///
    /// Yields exactly the examples `build` puts in its test split, without
    /// generating the (much larger) train split first. Used when reloading
    /// a finished run for evaluation.
    pub fn test_split(&self) -> Result<SequenceDataset> {
        self.validate()?;
        self.split("test", self.num_test, self.seed.wrapping_add(1))
    }

    fn split(&self, name: &str, count: usize, seed: u64) -> Result<SequenceDataset> {
        let mut rng = StdRng::seed_from_u64(seed);
        let examples = (0..count).map(|_| self.example(&mut rng)).collect();
        SequenceDataset::new(
            name,
            examples,
            self.num_features(),
            self.max_steps(),
            self.num_classes(),
        )
    }
}
