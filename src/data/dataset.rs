use burn::data::dataset::Dataset;

use crate::data::preprocessor::PreparedPartition;
use crate::domain::image::Label;

/// One preprocessed sample as handed to the batcher.
#[derive(Debug, Clone)]
pub struct DigitItem {
    pub pixels: Vec<f32>,
    pub target: Vec<f32>,
    pub label:  Label,
}

/// Burn Dataset view over a PreparedPartition (shares its buffers).
#[derive(Debug, Clone)]
pub struct DigitDataset {
    partition: PreparedPartition,
}

impl DigitDataset {
    pub fn new(partition: PreparedPartition) -> Self {
        Self { partition }
    }
}

impl Dataset<DigitItem> for DigitDataset {
    fn get(&self, index: usize) -> Option<DigitItem> {
        if index >= self.partition.len() {
            return None;
        }
        Some(DigitItem {
            pixels: self.partition.sample(index).to_vec(),
            target: self.partition.target(index).to_vec(),
            label:  self.partition.label(index),
        })
    }

    fn len(&self) -> usize {
        self.partition.len()
    }
}
