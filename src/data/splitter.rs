// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles a partition and splits it into two sets:
//   - Training set:   used to update model weights
//   - Validation set: measured after every epoch, never trained on
//
// The shuffle is seeded so the same seed always produces the same
// split, which keeps experiment runs comparable.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::error::PipelineResult;
use crate::domain::image::DatasetPartition;

/// Randomly shuffle `partition` and split it into (train, validation).
///
/// # Arguments
/// * `partition`      - All available samples (consumed by this function)
/// * `train_fraction` - Proportion kept for training, e.g. 0.9 = 90%
/// * `seed`           - Seed for the shuffle
///
/// The validation partition is named "<name>-val".
pub fn split_train_val(
    partition:      DatasetPartition,
    train_fraction: f64,
    seed:           u64,
) -> PipelineResult<(DatasetPartition, DatasetPartition)> {
    let (name, images, labels) = partition.into_parts();

    let mut samples: Vec<_> = images.into_iter().zip(labels).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    // Clamp to valid range to avoid panics on tiny datasets
    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at = split_at.min(total);

    // split_off(n) removes elements [n..] from the Vec and returns them
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    let (train_images, train_labels): (Vec<_>, Vec<_>) = samples.into_iter().unzip();
    let (val_images, val_labels): (Vec<_>, Vec<_>) = val.into_iter().unzip();

    Ok((
        DatasetPartition::new(name.clone(), train_images, train_labels)?,
        DatasetPartition::new(format!("{name}-val"), val_images, val_labels)?,
    ))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::{ImageSample, IMAGE_PIXELS};

    fn partition(n: usize) -> DatasetPartition {
        let images = (0..n)
            .map(|i| ImageSample::mnist(vec![i as u8; IMAGE_PIXELS]).unwrap())
            .collect();
        let labels = (0..n).map(|i| (i % 10) as u8).collect();
        DatasetPartition::new("train", images, labels).unwrap()
    }

    #[test]
    fn test_correct_split_sizes() {
        let (train, val) = split_train_val(partition(100), 0.8, 1).unwrap();
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(), 20);
        assert_eq!(val.name(), "train-val");
    }

    #[test]
    fn test_pairs_stay_aligned() {
        let (train, val) = split_train_val(partition(50), 0.7, 3).unwrap();
        for (image, label) in train.iter().chain(val.iter()) {
            // every image was filled with its index, labelled index % 10
            assert_eq!(image.pixels()[0] % 10, label);
        }
        assert_eq!(train.len() + val.len(), 50);
    }

    #[test]
    fn test_same_seed_same_split() {
        let (a, _) = split_train_val(partition(30), 0.5, 42).unwrap();
        let (b, _) = split_train_val(partition(30), 0.5, 42).unwrap();
        assert_eq!(a.labels(), b.labels());
        assert_eq!(a.images(), b.images());
    }

    #[test]
    fn test_empty_dataset() {
        let (train, val) = split_train_val(partition(0), 0.8, 0).unwrap();
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_full_training_split() {
        let (train, val) = split_train_val(partition(10), 1.0, 0).unwrap();
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }
}
