//! Synthetic digit partitions for tests that must not touch the real dataset.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::image::{DatasetPartition, ImageSample, IMAGE_SIDE, NUM_CLASSES};

/// `n` images where class k is a bright two-row band starting at row 2 + 2k,
/// on top of low-intensity noise. Labels cycle through 0..10.
pub fn banded_partition(name: &str, n: usize, seed: u64) -> DatasetPartition {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut images = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);

    for i in 0..n {
        let label = (i % NUM_CLASSES) as u8;
        let band = 2 + 2 * label as usize;

        let pixels = (0..IMAGE_SIDE * IMAGE_SIDE)
            .map(|p| {
                let row = p / IMAGE_SIDE;
                if row == band || row == band + 1 {
                    rng.gen_range(200..=255)
                } else {
                    rng.gen_range(0..30)
                }
            })
            .collect();

        images.push(ImageSample::mnist(pixels).expect("28x28 fixture"));
        labels.push(label);
    }

    DatasetPartition::new(name, images, labels).expect("aligned fixture")
}
