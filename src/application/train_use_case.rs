// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load train/test partitions    (Layer 4 - data)
//   Step 2: Limit and split validation    (Layer 4 - data)
//   Step 3: Preprocess for the model      (Layer 4 - data)
//   Step 4: Seed and build the model      (Layer 5 - ml)
//   Step 5: Save config                   (Layer 6 - infra)
//   Step 6: Run training loop             (Layer 5 - ml)
//   Step 7: Evaluate on the test set      (Layer 5 - ml)
//   Step 8: Save artifact and metrics     (Layer 6 - infra)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::application::{EvalBackend, TrainBackend};
use crate::data::{loader::MnistLoader, preprocessor::Preprocessor, splitter::split_train_val};
use crate::domain::architecture::ModelKind;
use crate::domain::error::PipelineError;
use crate::domain::image::DatasetPartition;
use crate::domain::training::{Evaluation, OptimizerKind, TrainingRunRecord};
use crate::domain::traits::DatasetSource;
use crate::infra::{metrics::MetricsLogger, persistence::ArtifactStore};
use crate::ml::{evaluator::evaluate, model::Model, trainer::train};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run.
// Serialisable so it can be saved next to the artifact and
// the run can be reproduced later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model:               ModelKind,
    pub data_dir:            String,
    pub artifact_dir:        String,
    pub epochs:              usize,
    pub batch_size:          usize,
    pub learning_rate:       f64,
    pub optimizer:           OptimizerKind,
    pub seed:                u64,
    /// Share of the training partition held out for validation (0 = none)
    pub val_fraction:        f64,
    pub limit_train:         Option<usize>,
    pub limit_test:          Option<usize>,
    pub download:            bool,
    pub abort_on_divergence: bool,
}

impl TrainConfig {
    /// Defaults of the reference experiment for `model`
    pub fn for_model(model: ModelKind) -> Self {
        let optimizer = OptimizerKind::Adam;
        Self {
            model,
            data_dir:            "data/mnist".to_string(),
            artifact_dir:        "artifacts".to_string(),
            epochs:              model.default_epochs(),
            batch_size:          128,
            learning_rate:       optimizer.default_learning_rate(),
            optimizer,
            seed:                42,
            val_fraction:        0.0,
            limit_train:         None,
            limit_test:          None,
            download:            true,
            abort_on_divergence: false,
        }
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self::for_model(ModelKind::Cnn)
    }
}

/// What one training run produced.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model:    ModelKind,
    pub record:   TrainingRunRecord,
    pub test:     Evaluation,
    pub artifact: PathBuf,
    pub params:   usize,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
    source: Box<dyn DatasetSource>,
}

impl TrainUseCase {
    /// Train on MNIST cached under `config.data_dir`
    pub fn new(config: TrainConfig) -> Self {
        let source = MnistLoader::new(&config.data_dir).with_download(config.download);
        Self::with_source(config, Box::new(source))
    }

    /// Train on partitions from any DatasetSource
    pub fn with_source(config: TrainConfig, source: Box<dyn DatasetSource>) -> Self {
        Self { config, source }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainOutcome> {
        let cfg = &self.config;
        let kind = cfg.model;

        // ── Step 1: Load partitions ───────────────────────────────────────────
        tracing::info!("Loading dataset from '{}'", cfg.data_dir);
        let (train_raw, test_raw) = self.source.load().context("Cannot load the dataset")?;

        // ── Step 2: Limit sizes, carve out validation ─────────────────────────
        let train_raw = limit(train_raw, cfg.limit_train);
        let test_raw  = limit(test_raw, cfg.limit_test);

        let (train_raw, val_raw) = if cfg.val_fraction > 0.0 {
            let (train, val) = split_train_val(train_raw, 1.0 - cfg.val_fraction, cfg.seed)?;
            if train.is_empty() || val.is_empty() {
                bail!(PipelineError::InvalidConfig(format!(
                    "validation fraction {} leaves {} training and {} validation samples",
                    cfg.val_fraction,
                    train.len(),
                    val.len()
                )));
            }
            (train, Some(val))
        } else {
            (train_raw, None)
        };
        tracing::info!(
            "Partitions: {} train, {} validation, {} test",
            train_raw.len(),
            val_raw.as_ref().map_or(0, DatasetPartition::len),
            test_raw.len()
        );
        tracing::debug!("Training class counts: {:?}", train_raw.class_counts());

        // ── Step 3: Preprocess into the model's layout ────────────────────────
        // Pixels → [0,1], labels → one-hot, layout per model kind
        let preprocessor = Preprocessor::new();
        let layout     = kind.layout();
        let train_data = preprocessor.prepare(&train_raw, layout)?;
        let test_data  = preprocessor.prepare(&test_raw, layout)?;
        let val_data   = val_raw.map(|v| preprocessor.prepare(&v, layout)).transpose()?;

        // ── Step 4: Seed and build the model ──────────────────────────────────
        // Seeding first makes parameter initialization reproducible
        let device = Default::default();
        TrainBackend::seed(cfg.seed);
        let model = Model::<TrainBackend>::build(kind.architecture(), &device)?;
        tracing::info!(
            "Built {} model ({} parameters):\n{}",
            kind.name(),
            model.num_params(),
            model.architecture().summary()?
        );

        // ── Step 5: Save config for reproducibility ───────────────────────────
        let store = ArtifactStore::create(&cfg.artifact_dir)?;
        store.save_config(cfg)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        let (model, record) = train(model, &train_data, val_data.as_ref(), cfg)?;

        let metrics = MetricsLogger::new(store.dir())?;
        metrics.log_run(kind, &record)?;
        tracing::info!("Epoch metrics appended to '{}'", metrics.csv_path().display());

        if let Some(divergence) = record.divergence() {
            if cfg.abort_on_divergence {
                bail!(divergence);
            }
            tracing::warn!("{divergence}; keeping the model as requested");
        }

        // ── Step 7: Evaluate on the held-out test partition ───────────────────
        // model.valid() → Model<EvalBackend>, dropout disabled
        let model: Model<EvalBackend> = model.valid();
        let test = evaluate(&model, &test_data, cfg.batch_size)?;
        tracing::info!(
            "{} test accuracy {:.2}% (loss {:.4}) on {} samples",
            kind.name(),
            test.accuracy * 100.0,
            test.loss,
            test.samples
        );

        // ── Step 8: Save the artifact ─────────────────────────────────────────
        let artifact = store.save_model(kind, &model)?;

        Ok(TrainOutcome { model: kind, record, test, artifact, params: model.num_params() })
    }
}

fn limit(partition: DatasetPartition, limit: Option<usize>) -> DatasetPartition {
    match limit {
        Some(n) => partition.take(n),
        None => partition,
    }
}
