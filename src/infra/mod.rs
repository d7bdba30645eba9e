// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence concerns:
//
//   checkpoint.rs — Saving and loading the RWA parameters with
//                   Burn's NamedMpkFileRecorder, plus the run's
//                   TrainConfig as JSON so the model can be rebuilt.
//
//   metrics.rs    — CSV log of every reported cost.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Cost CSV logger
pub mod metrics;
