// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns a raw DatasetPartition into model-ready numbers.
//
// Steps applied to every sample:
//   1. Check the image is 28 × 28
//   2. Lay it out for the target model
//        ChannelFirstImage → (1, 28, 28)   CNN
//        FlattenedVector   → (784)         linear model
//   3. Cast u8 → f32 and divide by 255.0, so pixels lie in [0, 1]
//   4. One-hot encode the label into a vector of num_classes
//
// Both layouts store the same row-major values (a single channel
// image flattens to the same order); only the declared shape
// differs, and the batcher reshapes accordingly.
//
// prepare() is a pure function of its input: calling it twice on
// the same partition yields identical output.

use std::sync::Arc;

use crate::domain::architecture::{DataShape, InputLayout};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::image::{DatasetPartition, Label, IMAGE_PIXELS, IMAGE_SIDE, NUM_CLASSES};

/// One-hot encode `label` into a vector of length `num_classes`.
pub fn to_one_hot(label: Label, num_classes: usize) -> PipelineResult<Vec<f32>> {
    let index = label as usize;
    if index >= num_classes {
        return Err(PipelineError::shape_mismatch(
            format!("label in 0..{num_classes}"),
            format!("label {label}"),
        ));
    }
    let mut one_hot = vec![0.0f32; num_classes];
    one_hot[index] = 1.0;
    Ok(one_hot)
}

/// A partition after preprocessing.
///
/// Buffers are flat and reference counted: `pixels` holds
/// `len × sample_size` values, `targets` holds `len × num_classes`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPartition {
    name:        String,
    layout:      InputLayout,
    num_classes: usize,
    pixels:      Arc<Vec<f32>>,
    targets:     Arc<Vec<f32>>,
    labels:      Arc<Vec<Label>>,
}

impl PreparedPartition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> InputLayout {
        self.layout
    }

    /// Per-sample shape (without the batch dimension)
    pub fn sample_shape(&self) -> DataShape {
        self.layout.data_shape()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Normalized pixels of sample `index`
    pub fn sample(&self, index: usize) -> &[f32] {
        &self.pixels[index * IMAGE_PIXELS..(index + 1) * IMAGE_PIXELS]
    }

    /// One-hot target of sample `index`
    pub fn target(&self, index: usize) -> &[f32] {
        &self.targets[index * self.num_classes..(index + 1) * self.num_classes]
    }

    pub fn label(&self, index: usize) -> Label {
        self.labels[index]
    }

    #[cfg(test)]
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }
}

/// Stateless preprocessor; holds only the number of classes.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    num_classes: usize,
}

impl Preprocessor {
    /// Create a preprocessor for the 10 digit classes
    pub fn new() -> Self {
        Self { num_classes: NUM_CLASSES }
    }

    #[cfg(test)]
    pub fn with_num_classes(num_classes: usize) -> Self {
        Self { num_classes }
    }

    /// Lay out, normalize, and one-hot encode a whole partition.
    /// Fails with ShapeMismatch on the first image that is not 28 × 28.
    pub fn prepare(
        &self,
        partition: &DatasetPartition,
        layout:    InputLayout,
    ) -> PipelineResult<PreparedPartition> {
        let mut pixels  = Vec::with_capacity(partition.len() * IMAGE_PIXELS);
        let mut targets = Vec::with_capacity(partition.len() * self.num_classes);

        for (index, (image, label)) in partition.iter().enumerate() {
            if image.height() != IMAGE_SIDE || image.width() != IMAGE_SIDE {
                return Err(PipelineError::shape_mismatch(
                    format!("{IMAGE_SIDE}x{IMAGE_SIDE} image"),
                    format!("{}x{} image at index {index}", image.height(), image.width()),
                ));
            }

            pixels.extend(image.pixels().iter().map(|&p| p as f32 / 255.0));
            targets.extend(to_one_hot(label, self.num_classes)?);
        }

        tracing::debug!(
            "Prepared {} samples of '{}' as {:?}",
            partition.len(),
            partition.name(),
            layout
        );

        Ok(PreparedPartition {
            name:        partition.name().to_string(),
            layout,
            num_classes: self.num_classes,
            pixels:      Arc::new(pixels),
            targets:     Arc::new(targets),
            labels:      Arc::new(partition.labels().to_vec()),
        })
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::ImageSample;

    fn partition() -> DatasetPartition {
        let ramp: Vec<u8> = (0..IMAGE_PIXELS).map(|i| (i % 256) as u8).collect();
        let images = vec![
            ImageSample::mnist(vec![0; IMAGE_PIXELS]).unwrap(),
            ImageSample::mnist(vec![255; IMAGE_PIXELS]).unwrap(),
            ImageSample::mnist(ramp).unwrap(),
        ];
        DatasetPartition::new("train", images, vec![0, 9, 4]).unwrap()
    }

    #[test]
    fn test_pixels_are_normalized() {
        let prepared = Preprocessor::new()
            .prepare(&partition(), InputLayout::FlattenedVector)
            .unwrap();

        assert!(prepared.pixels().iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert_eq!(prepared.sample(0)[0], 0.0);
        assert_eq!(prepared.sample(1)[100], 1.0);
        assert_eq!(prepared.sample(2)[255], 1.0);
        assert_eq!(prepared.pixels().len(), 3 * IMAGE_PIXELS);
    }

    #[test]
    fn test_targets_are_one_hot() {
        let prepared = Preprocessor::new()
            .prepare(&partition(), InputLayout::ChannelFirstImage)
            .unwrap();

        for i in 0..prepared.len() {
            let target = prepared.target(i);
            assert_eq!(target.len(), NUM_CLASSES);
            assert_eq!(target.iter().sum::<f32>(), 1.0);
            assert_eq!(target[prepared.label(i) as usize], 1.0);
        }
    }

    #[test]
    fn test_one_hot_every_digit() {
        for label in 0..NUM_CLASSES as u8 {
            let v = to_one_hot(label, NUM_CLASSES).unwrap();
            assert_eq!(v.len(), NUM_CLASSES);
            assert_eq!(v.iter().filter(|&&x| x == 1.0).count(), 1);
            assert_eq!(v.iter().filter(|&&x| x == 0.0).count(), NUM_CLASSES - 1);
        }
    }

    #[test]
    fn test_one_hot_rejects_out_of_range() {
        assert!(matches!(to_one_hot(10, 10), Err(PipelineError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_layout_sets_shape() {
        let p = Preprocessor::new();
        let image = p.prepare(&partition(), InputLayout::ChannelFirstImage).unwrap();
        let flat  = p.prepare(&partition(), InputLayout::FlattenedVector).unwrap();

        assert_eq!(
            image.sample_shape(),
            DataShape::Image { channels: 1, height: 28, width: 28 }
        );
        assert_eq!(flat.sample_shape(), DataShape::Flat(784));
        assert_eq!(image.pixels(), flat.pixels());
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let p   = Preprocessor::new();
        let raw = partition();
        let first  = p.prepare(&raw, InputLayout::FlattenedVector).unwrap();
        let second = p.prepare(&raw, InputLayout::FlattenedVector).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_non_mnist_images() {
        let small = ImageSample::new(14, 14, vec![0; 196]).unwrap();
        let part  = DatasetPartition::new("odd", vec![small], vec![3]).unwrap();

        let err = Preprocessor::new()
            .prepare(&part, InputLayout::FlattenedVector)
            .unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }
}
