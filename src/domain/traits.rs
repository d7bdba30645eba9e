// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The trainer never knows where its data comes from. It only
// talks to a BatchSource: something that knows the dataset's
// dimensions and can hand out fixed-shape batches for a split.
//
// Implementations:
//   - SequenceDataset → an in-memory split (e.g. the copy problem)
//   - (tests) small hand-built sources
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use rand::RngCore;

use crate::domain::batch::SequenceBatch;

// ─── BatchSource ──────────────────────────────────────────────────────────────
/// One split ("train" or "test") of a sequence classification dataset.
///
/// Every batch returned must have shapes
/// `(size, max_steps, num_features)`, `(size,)` and
/// `(size, max_steps, num_classes)`.
pub trait BatchSource {
    /// Name of the split, used in console reports ("train", "test")
    fn name(&self) -> &str;

    /// Width of the input vector at every time step.
    ///
    /// Fixes the row count of the input projection, so it must be the
    /// same for the train and test splits of one run.
    fn num_features(&self) -> usize;

    /// Padded sequence length; the model unrolls this many steps for
    /// every batch regardless of the examples' valid lengths.
    fn max_steps(&self) -> usize;

    /// Number of target classes, i.e. the width of each one-hot label row
    /// and of the output logits.
    fn num_classes(&self) -> usize;

    /// Total examples in the split; informational only
    fn num_examples(&self) -> usize;

    /// Draw a batch of `size` examples using the caller's RNG.
    fn batch(&self, size: usize, rng: &mut dyn RngCore) -> Result<SequenceBatch>;
}
