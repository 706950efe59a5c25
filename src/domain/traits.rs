// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer loads data through DatasetSource rather
// than a concrete loader. Implementations:
//   - MnistLoader     → IDX files in a local cache (downloads on miss)
//   - InMemorySource  → partitions already in memory (tests, subsets)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use crate::domain::error::PipelineResult;
use crate::domain::image::DatasetPartition;

// ─── DatasetSource ────────────────────────────────────────────────────────────
/// Any component that can provide the training and test partitions.
pub trait DatasetSource {
    /// Returns (train, test). Fails with DataUnavailable if the
    /// backing data cannot be fetched or is corrupted.
    fn load(&self) -> PipelineResult<(DatasetPartition, DatasetPartition)>;

    /// Only the test partition. Sources that can skip reading the
    /// training data should override this.
    fn load_test(&self) -> PipelineResult<DatasetPartition> {
        self.load().map(|(_, test)| test)
    }
}

/// A source that hands out clones of partitions it already holds.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    train: DatasetPartition,
    test:  DatasetPartition,
}

impl InMemorySource {
    pub fn new(train: DatasetPartition, test: DatasetPartition) -> Self {
        Self { train, test }
    }
}

impl DatasetSource for InMemorySource {
    fn load(&self) -> PipelineResult<(DatasetPartition, DatasetPartition)> {
        Ok((self.train.clone(), self.test.clone()))
    }
}
