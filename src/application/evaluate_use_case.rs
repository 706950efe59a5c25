// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Loads a saved artifact and measures it on the test partition:
//   1. Load the test partition (train is never read)
//   2. Restore the model from the artifact directory
//   3. Preprocess the test images for that model's layout
//   4. Evaluate, optionally with a per-class breakdown

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::EvalBackend;
use crate::data::{loader::MnistLoader, preprocessor::Preprocessor};
use crate::domain::architecture::ModelKind;
use crate::domain::training::Evaluation;
use crate::domain::traits::DatasetSource;
use crate::infra::persistence::ArtifactStore;
use crate::ml::evaluator::{evaluate, predict, ConfusionMatrix};

/// Settings for evaluating one saved model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateConfig {
    pub model:        ModelKind,
    pub data_dir:     String,
    pub artifact_dir: String,
    pub batch_size:   usize,
    pub limit_test:   Option<usize>,
    pub download:     bool,
    pub per_class:    bool,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            model:        ModelKind::Cnn,
            data_dir:     "data/mnist".to_string(),
            artifact_dir: "artifacts".to_string(),
            batch_size:   128,
            limit_test:   None,
            download:     true,
            per_class:    false,
        }
    }
}

/// Result of evaluating a saved model.
#[derive(Debug, Clone)]
pub struct EvaluateOutcome {
    pub model:      ModelKind,
    pub evaluation: Evaluation,
    /// Only filled when a per-class report was requested
    pub confusion:  Option<ConfusionMatrix>,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
    source: Box<dyn DatasetSource>,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        let source = MnistLoader::new(&config.data_dir).with_download(config.download);
        Self::with_source(config, Box::new(source))
    }

    pub fn with_source(config: EvaluateConfig, source: Box<dyn DatasetSource>) -> Self {
        Self { config, source }
    }

    pub fn execute(&self) -> Result<EvaluateOutcome> {
        let cfg = &self.config;

        let test_raw = self.source.load_test().context("Cannot load the test partition")?;
        let test_raw = match cfg.limit_test {
            Some(n) => test_raw.take(n),
            None => test_raw,
        };

        let store = ArtifactStore::open(&cfg.artifact_dir);
        let device = Default::default();
        let model = store
            .load_model::<EvalBackend>(cfg.model, &device)
            .with_context(|| format!("Have you run 'train --model {}' first?", cfg.model.name()))?;

        let layout = model
            .architecture()
            .input_layout()
            .context("Stored architecture has a non-standard input shape")?;
        let test_data = Preprocessor::new().prepare(&test_raw, layout)?;

        let evaluation = evaluate(&model, &test_data, cfg.batch_size)?;
        tracing::info!(
            "{} accuracy {:.2}% (loss {:.4}) on {} samples",
            cfg.model.name(),
            evaluation.accuracy * 100.0,
            evaluation.loss,
            evaluation.samples
        );

        let confusion = if cfg.per_class {
            let predictions = predict(&model, &test_data, cfg.batch_size)?;
            Some(ConfusionMatrix::from_predictions(
                &predictions,
                test_data.labels(),
                test_data.num_classes(),
            )?)
        } else {
            None
        };

        Ok(EvaluateOutcome { model: cfg.model, evaluation, confusion })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::banded_partition;
    use crate::domain::traits::InMemorySource;
    use crate::ml::model::Model;

    fn source() -> Box<dyn DatasetSource> {
        Box::new(InMemorySource::new(
            banded_partition("train", 10, 1),
            banded_partition("test", 25, 2),
        ))
    }

    #[test]
    fn test_evaluates_saved_model_with_per_class_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::create(dir.path()).unwrap();
        let model = Model::<EvalBackend>::build(ModelKind::Linear.architecture(), &Default::default())
            .unwrap();
        store.save_model(ModelKind::Linear, &model).unwrap();

        let cfg = EvaluateConfig {
            model: ModelKind::Linear,
            artifact_dir: dir.path().display().to_string(),
            per_class: true,
            ..EvaluateConfig::default()
        };
        let outcome = EvaluateUseCase::with_source(cfg, source()).execute().unwrap();

        assert_eq!(outcome.evaluation.samples, 25);
        let confusion = outcome.confusion.unwrap();
        assert_eq!(confusion.total(), 25);
        assert!((confusion.accuracy() - outcome.evaluation.accuracy).abs() < 1e-12);
    }

    #[test]
    fn test_missing_artifact_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EvaluateConfig {
            artifact_dir: dir.path().display().to_string(),
            ..EvaluateConfig::default()
        };
        let err = EvaluateUseCase::with_source(cfg, source()).execute().unwrap_err();
        assert!(err.to_string().contains("train --model cnn"), "{err}");
    }
}
