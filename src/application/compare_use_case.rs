// ============================================================
// Layer 2 — Compare Use Case
// ============================================================
// Reproduces the reference experiment: the CNN and the linear
// baseline are trained on the same partitions, each with its own
// epoch count, evaluated on the same test set, and reported side
// by side. The dataset is read once and shared through an
// InMemorySource.

use anyhow::{Context, Result};

use crate::application::train_use_case::{TrainConfig, TrainOutcome, TrainUseCase};
use crate::data::loader::MnistLoader;
use crate::domain::architecture::ModelKind;
use crate::domain::traits::{DatasetSource, InMemorySource};

/// Runs one TrainUseCase per model kind on shared data.
pub struct CompareUseCase {
    /// Settings shared by both runs; `model` and `epochs` are per run
    base:   TrainConfig,
    /// Epoch override for both runs, None for each kind's default
    epochs: Option<usize>,
    source: Box<dyn DatasetSource>,
}

impl CompareUseCase {
    pub fn new(base: TrainConfig, epochs: Option<usize>) -> Self {
        let source = MnistLoader::new(&base.data_dir).with_download(base.download);
        Self::with_source(base, epochs, Box::new(source))
    }

    pub fn with_source(base: TrainConfig, epochs: Option<usize>, source: Box<dyn DatasetSource>) -> Self {
        Self { base, epochs, source }
    }

    pub fn execute(&self) -> Result<ComparisonReport> {
        let (train, test) = self.source.load().context("Cannot load the dataset")?;
        let shared = InMemorySource::new(train, test);

        let mut runs = Vec::new();
        for kind in [ModelKind::Cnn, ModelKind::Linear] {
            let cfg = TrainConfig {
                model:  kind,
                epochs: self.epochs.unwrap_or(kind.default_epochs()),
                ..self.base.clone()
            };
            tracing::info!("── Training {} for {} epochs ──", kind.name(), cfg.epochs);

            let outcome = TrainUseCase::with_source(cfg, Box::new(shared.clone()))
                .execute()
                .with_context(|| format!("{} run failed", kind.name()))?;
            runs.push(outcome);
        }

        Ok(ComparisonReport { runs })
    }
}

/// Side-by-side results of the compared runs.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub runs: Vec<TrainOutcome>,
}

impl ComparisonReport {
    /// The run with the highest test accuracy
    pub fn best(&self) -> Option<&TrainOutcome> {
        self.runs
            .iter()
            .max_by(|a, b| a.test.accuracy.total_cmp(&b.test.accuracy))
    }

    /// Plain-text table, one row per model
    pub fn table(&self) -> String {
        let mut lines = vec![format!(
            "{:<8} {:>7} {:>11} {:>10} {:>10}",
            "model", "epochs", "params", "test_loss", "test_acc"
        )];
        for run in &self.runs {
            lines.push(format!(
                "{:<8} {:>7} {:>11} {:>10.4} {:>9.2}%",
                run.model.name(),
                run.record.len(),
                run.params,
                run.test.loss,
                run.test.accuracy * 100.0
            ));
        }
        lines.join("\n")
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::banded_partition;

    #[test]
    fn test_compares_both_models_on_shared_data() {
        let dir = tempfile::tempdir().unwrap();
        let base = TrainConfig {
            artifact_dir: dir.path().display().to_string(),
            batch_size: 10,
            ..TrainConfig::default()
        };
        let source = InMemorySource::new(banded_partition("train", 20, 1), banded_partition("test", 10, 2));

        let report = CompareUseCase::with_source(base, Some(1), Box::new(source)).execute().unwrap();

        let names: Vec<_> = report.runs.iter().map(|r| r.model).collect();
        assert_eq!(names, vec![ModelKind::Cnn, ModelKind::Linear]);
        assert!(report.runs.iter().all(|r| r.record.len() == 1 && r.test.samples == 10));
        assert!(dir.path().join("cnn.mpk.gz").exists());
        assert!(dir.path().join("linear.mpk.gz").exists());
        assert!(dir.path().join("train_config_cnn.json").exists());
        assert!(dir.path().join("train_config_linear.json").exists());

        let table = report.table();
        assert_eq!(table.lines().count(), 3);
        assert!(table.contains("linear"));
        assert!(report.best().is_some());
    }

    #[test]
    #[ignore = "downloads MNIST and trains for 60 epochs in total"]
    fn test_reference_experiment_cnn_beats_linear() {
        let dir = tempfile::tempdir().unwrap();
        let base = TrainConfig {
            artifact_dir: dir.path().display().to_string(),
            ..TrainConfig::default()
        };

        let report = CompareUseCase::new(base, None).execute().unwrap();
        let (cnn, linear) = (&report.runs[0], &report.runs[1]);

        assert_eq!(cnn.record.len(), 10);
        assert_eq!(linear.record.len(), 50);
        assert!(linear.test.accuracy > 0.85, "linear {}", linear.test.accuracy);
        assert!(linear.test.accuracy < cnn.test.accuracy);
    }
}
