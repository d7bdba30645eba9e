// ============================================================
// Layer 4 — RWA Batcher
// ============================================================
// Turns a plain SequenceBatch into the three tensors the RWA
// model is fed with:
//
//   features [batch, max_steps, num_features]
//   lengths  [batch]
//   labels   [batch, max_steps, num_classes]
//
// The batch is already fixed-shape (validated by the domain
// layer), so this is a straight copy onto the device.
//
// Reference: Burn Book §4 (Batcher)

use burn::{prelude::*, tensor::TensorData};

use crate::domain::batch::SequenceBatch;

/// One batch on the device. B is the Burn Backend, so the same
/// batcher feeds both the autodiff training backend and the
/// plain evaluation backend.
#[derive(Debug, Clone)]
pub struct RwaBatch<B: Backend> {
    pub features: Tensor<B, 3>,
    pub lengths:  Tensor<B, 1>,
    pub labels:   Tensor<B, 3>,
}

/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct RwaBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> RwaBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, batch: &SequenceBatch) -> RwaBatch<B> {
        let (n, steps) = (batch.batch_size, batch.max_steps);

        let features = Tensor::<B, 3>::from_data(
            TensorData::new(batch.features.clone(), [n, steps, batch.num_features]),
            &self.device,
        );
        let lengths = Tensor::<B, 1>::from_data(
            TensorData::new(batch.lengths.clone(), [n]),
            &self.device,
        );
        let labels = Tensor::<B, 3>::from_data(
            TensorData::new(batch.labels.clone(), [n, steps, batch.num_classes]),
            &self.device,
        );

        RwaBatch { features, lengths, labels }
    }
}
