// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from IDX files on disk
// all the way to tensor batches.
//
// The pipeline flows in this order:
//
//   IDX files (cache / mirror)
//       │
//       ▼
//   MnistLoader       → reads files into DatasetPartitions
//       │
//       ▼
//   split_train_val   → optional validation hold-out
//       │
//       ▼
//   Preprocessor      → layout, [0,1] normalization, one-hot labels
//       │
//       ▼
//   DigitDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   DigitBatcher      → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to training / evaluation
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads MNIST IDX files from a cache directory
pub mod loader;

/// Normalizes images and one-hot encodes labels
pub mod preprocessor;

/// Implements Burn's Dataset trait for prepared samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;

#[cfg(test)]
pub mod fixtures;
