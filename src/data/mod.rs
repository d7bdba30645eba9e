// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from example generation to device-ready tensors.
//
//   CopyProblemConfig → generates labelled sequences per split
//       │
//       ▼
//   SequenceDataset   → fixed-size split, samples batches
//       │               (implements BatchSource + Burn's Dataset)
//       ▼
//   RwaBatcher        → SequenceBatch → tensors on a device
//
// Reference: Burn Book §4 (Datasets)

/// Delayed copy task generator
pub mod copy_problem;

/// In-memory split with batch sampling
pub mod dataset;

/// SequenceBatch → Burn tensors
pub mod batcher;
