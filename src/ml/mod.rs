// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn tensor math lives here.
//
//   model.rs     — RwaConfig and the RwaModel parameter set,
//                  seeded initialization, the unrolled forward
//                  pass with length-masked cost
//
//   cell.rs      — One recurrent step and the numerically
//                  stable running weighted average
//
//   trainer.rs   — The training loop: Adam updates, periodic
//                  test batches, final checkpoint
//
//   evaluator.rs — Forward-only cost on the inner backend
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Ostmeyer & Cowell (2017) Recurrent Weighted Average

use burn::tensor::backend::AutodiffBackend;

/// RWA parameters, initialization and forward pass
pub mod model;

/// The recurrence itself
pub mod cell;

/// Training loop with periodic evaluation and checkpointing
pub mod trainer;

/// Checkpoint-backed evaluation
pub mod evaluator;

#[cfg(not(feature = "wgpu"))]
pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

#[cfg(feature = "wgpu")]
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Same device, no gradient tracking
pub type EvalBackend = <TrainBackend as AutodiffBackend>::InnerBackend;
