// ============================================================
// Layer 4 — Digit Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<DigitItem>
// into tensors on the target device.
//
// How batching works here:
//   Input:  Vec of N DigitItems, each with 784 pixels and a
//           one-hot target of length C
//   Output: DigitBatch with
//             images  [N, 784]   (flat; the model reshapes to
//                                 (N, 1, 28, 28) when its input
//                                 is an image)
//             targets [N, C]     one-hot, f32
//             labels  [N]        class ids, for accuracy
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::DigitItem;

// ─── DigitBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DigitBatch<B: Backend> {
    /// Normalized pixels — shape: [batch_size, features]
    pub images: Tensor<B, 2>,

    /// One-hot targets — shape: [batch_size, num_classes]
    pub targets: Tensor<B, 2>,

    /// Integer labels — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> DigitBatch<B> {
    pub fn len(&self) -> usize {
        self.labels.dims()[0]
    }
}

// ─── DigitBatcher ─────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the right CPU/GPU.
#[derive(Clone, Debug)]
pub struct DigitBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> DigitBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<DigitItem, DigitBatch<B>> for DigitBatcher<B> {
    fn batch(&self, items: Vec<DigitItem>) -> DigitBatch<B> {
        let batch_size  = items.len();
        let features    = items.first().map(|i| i.pixels.len()).unwrap_or_default();
        let num_classes = items.first().map(|i| i.target.len()).unwrap_or_default();

        // ── Flatten per-sample vectors into one buffer each ───────────────────
        let pixels: Vec<f32> = items.iter().flat_map(|i| i.pixels.iter().copied()).collect();
        let targets: Vec<f32> = items.iter().flat_map(|i| i.target.iter().copied()).collect();
        let labels: Vec<i32> = items.iter().map(|i| i.label as i32).collect();

        // ── Create tensors ────────────────────────────────────────────────────
        let images = Tensor::<B, 2>::from_data(
            TensorData::new(pixels, [batch_size, features]).convert::<B::FloatElem>(),
            &self.device,
        );
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(targets, [batch_size, num_classes]).convert::<B::FloatElem>(),
            &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        DigitBatch { images, targets, labels }
    }
}
