// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - model:        which variant produced the row (cnn, linear)
//   - epoch:        the epoch number (1, 2, 3, ...)
//   - loss:         sample-weighted mean training loss
//   - accuracy:     fraction of training samples classified correctly
//   - val_loss:     validation loss, empty without a validation split
//   - val_accuracy: validation accuracy, empty likewise
//
// Output file: artifacts/metrics.csv
//
// Example CSV output:
//   model,epoch,loss,accuracy,val_loss,val_accuracy
//   cnn,1,0.212300,0.934100,0.071200,0.977800
//   cnn,2,0.081400,0.975200,0.052900,0.983100
//   linear,1,0.612000,0.853300,,
//
// A NaN loss is written as "NaN" so diverged runs stay visible.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::architecture::ModelKind;
use crate::domain::training::{EpochMetrics, TrainingRunRecord};

const HEADER: &str = "model,epoch,loss,accuracy,val_loss,val_accuracy";

/// Appends epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a logger writing to `<dir>/metrics.csv`.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        // Header only for a new file, so runs append to one log
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, model: ModelKind, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{}", format_row(model, m))?;

        tracing::debug!(
            "Logged {} epoch {} metrics: loss={:.4}, accuracy={:.4}",
            model.name(),
            m.epoch,
            m.loss,
            m.accuracy,
        );
        Ok(())
    }

    /// Append every epoch of a finished run.
    pub fn log_run(&self, model: ModelKind, record: &TrainingRunRecord) -> Result<()> {
        record.epochs().iter().try_for_each(|m| self.log(model, m))
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

fn format_row(model: ModelKind, m: &EpochMetrics) -> String {
    let optional = |v: Option<f64>| v.map(|v| format!("{v:.6}")).unwrap_or_default();
    format!(
        "{},{},{:.6},{:.6},{},{}",
        model.name(),
        m.epoch,
        m.loss,
        m.accuracy,
        optional(m.val_loss),
        optional(m.val_accuracy),
    )
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::training::Evaluation;

    #[test]
    fn test_row_without_validation_leaves_columns_empty() {
        let row = format_row(ModelKind::Linear, &EpochMetrics::new(3, 0.5, 0.875));
        assert_eq!(row, "linear,3,0.500000,0.875000,,");
    }

    #[test]
    fn test_row_with_validation() {
        let eval = Evaluation { loss: 0.25, accuracy: 0.9, samples: 10 };
        let row = format_row(ModelKind::Cnn, &EpochMetrics::new(1, 1.0, 0.5).with_validation(eval));
        assert_eq!(row, "cnn,1,1.000000,0.500000,0.250000,0.900000");
    }

    #[test]
    fn test_nan_loss_is_written() {
        let row = format_row(ModelKind::Cnn, &EpochMetrics::new(2, f64::NAN, 0.1));
        assert!(row.starts_with("cnn,2,NaN,"));
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = TrainingRunRecord::new();
        record.push(EpochMetrics::new(1, 2.0, 0.2));
        record.push(EpochMetrics::new(2, 1.0, 0.6));

        MetricsLogger::new(dir.path()).unwrap().log_run(ModelKind::Cnn, &record).unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(ModelKind::Linear, &EpochMetrics::new(1, 0.7, 0.8)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], HEADER);
        assert!(lines[2].starts_with("cnn,2,"));
        assert!(lines[3].starts_with("linear,1,"));
    }
}
