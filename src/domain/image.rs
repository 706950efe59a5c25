// ============================================================
// Layer 3 — Image Samples and Dataset Partitions
// ============================================================
// The raw, framework-free view of the digit dataset:
//
//   ImageSample       — a height × width grid of u8 intensities
//   Label             — the digit class, 0..=9
//   DatasetPartition  — index-aligned images + labels
//
// Partitions are immutable once built. Preprocessing produces
// a new PreparedPartition (Layer 4) instead of mutating these.
//
// Reference: Rust Book §5 (Structs), §8 (Vectors)

use crate::domain::error::{PipelineError, PipelineResult};

/// Height and width of every canonical MNIST image.
pub const IMAGE_SIDE: usize = 28;

/// Number of pixels in a canonical image (28 × 28).
pub const IMAGE_PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;

/// Number of digit classes.
pub const NUM_CLASSES: usize = 10;

/// Digit class identifier in `0..NUM_CLASSES`.
pub type Label = u8;

/// A single-channel grayscale image stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSample {
    height: usize,
    width:  usize,
    pixels: Vec<u8>,
}

impl ImageSample {
    /// Build an image of arbitrary size.
    /// Fails if the pixel buffer does not hold exactly height × width values.
    pub fn new(height: usize, width: usize, pixels: Vec<u8>) -> PipelineResult<Self> {
        if pixels.len() != height * width {
            return Err(PipelineError::shape_mismatch(
                format!("{} pixels for a {height}x{width} image", height * width),
                format!("{} pixels", pixels.len()),
            ));
        }
        Ok(Self { height, width, pixels })
    }

    /// Build a canonical 28 × 28 image.
    #[cfg(test)]
    pub fn mnist(pixels: Vec<u8>) -> PipelineResult<Self> {
        Self::new(IMAGE_SIDE, IMAGE_SIDE, pixels)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Intensity at (row, col), or None when out of bounds.
    #[cfg(test)]
    pub fn pixel(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.pixels.get(row * self.width + col).copied()
    }
}

/// One split of the dataset (training or test).
///
/// `images[i]` is labelled by `labels[i]` for every i.
#[derive(Debug, Clone)]
pub struct DatasetPartition {
    name:   String,
    images: Vec<ImageSample>,
    labels: Vec<Label>,
}

impl DatasetPartition {
    /// Pair up images and labels.
    /// Fails if the two sequences differ in length or a label is not a digit.
    pub fn new(
        name:   impl Into<String>,
        images: Vec<ImageSample>,
        labels: Vec<Label>,
    ) -> PipelineResult<Self> {
        if images.len() != labels.len() {
            return Err(PipelineError::shape_mismatch(
                format!("{} labels", images.len()),
                format!("{} labels", labels.len()),
            ));
        }

        if let Some(bad) = labels.iter().find(|&&l| l as usize >= NUM_CLASSES) {
            return Err(PipelineError::shape_mismatch(
                format!("labels in 0..{NUM_CLASSES}"),
                format!("label {bad}"),
            ));
        }

        Ok(Self { name: name.into(), images, labels })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[cfg(test)]
    pub fn images(&self) -> &[ImageSample] {
        &self.images
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Iterate over (image, label) pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&ImageSample, Label)> {
        self.images.iter().zip(self.labels.iter().copied())
    }

    /// Keep only the first `n` samples (or all of them if there are fewer).
    pub fn take(mut self, n: usize) -> Self {
        self.images.truncate(n);
        self.labels.truncate(n);
        self
    }

    /// Number of samples per class, indexed by label.
    pub fn class_counts(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for &label in &self.labels {
            counts[label as usize] += 1;
        }
        counts
    }

    /// Split into owned parts. Used by the splitter to reshuffle samples.
    pub fn into_parts(self) -> (String, Vec<ImageSample>, Vec<Label>) {
        (self.name, self.images, self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(label: Label) -> (ImageSample, Label) {
        (ImageSample::mnist(vec![0; IMAGE_PIXELS]).unwrap(), label)
    }

    #[test]
    fn test_image_rejects_wrong_pixel_count() {
        let err = ImageSample::new(28, 28, vec![0; 700]).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_pixel_lookup_is_row_major() {
        let mut pixels = vec![0u8; 6];
        pixels[4] = 200; // row 1, col 1 in a 2x3 image
        let img = ImageSample::new(2, 3, pixels).unwrap();
        assert_eq!(img.pixel(1, 1), Some(200));
        assert_eq!(img.pixel(2, 0), None);
    }

    #[test]
    fn test_partition_rejects_misaligned_labels() {
        let (img, _) = blank(0);
        let err = DatasetPartition::new("train", vec![img], vec![1, 2]).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_partition_rejects_non_digit_labels() {
        let (img, _) = blank(0);
        assert!(DatasetPartition::new("train", vec![img], vec![10]).is_err());
    }

    #[test]
    fn test_take_and_class_counts() {
        let (images, labels): (Vec<_>, Vec<_>) = [3, 3, 7, 1].into_iter().map(blank).unzip();
        let part = DatasetPartition::new("test", images, labels).unwrap().take(3);

        assert_eq!(part.len(), 3);
        let counts = part.class_counts();
        assert_eq!(counts[3], 2);
        assert_eq!(counts[7], 1);
        assert_eq!(counts[1], 0);
    }
}
