// ============================================================
// Layer 3 — Training Records
// ============================================================
// Plain data produced by training and evaluation:
//
//   EpochMetrics       — loss/accuracy for one epoch
//   TrainingRunRecord  — ordered, append-only list of epochs
//   Evaluation         — loss/accuracy of a model on a partition
//   OptimizerKind      — which update rule the trainer uses
//
// Divergence (a NaN or infinite loss) is recorded, not raised:
// the record keeps every epoch and the caller asks it whether
// training diverged.

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;

/// Metrics for a single epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean categorical cross-entropy over the training samples
    pub loss: f64,

    /// Fraction of training samples classified correctly
    pub accuracy: f64,

    /// Loss on the held-out validation partition, if one was given
    pub val_loss: Option<f64>,

    /// Accuracy on the held-out validation partition, if one was given
    pub val_accuracy: Option<f64>,
}

impl EpochMetrics {
    pub fn new(epoch: usize, loss: f64, accuracy: f64) -> Self {
        Self { epoch, loss, accuracy, val_loss: None, val_accuracy: None }
    }

    pub fn with_validation(mut self, evaluation: Evaluation) -> Self {
        self.val_loss = Some(evaluation.loss);
        self.val_accuracy = Some(evaluation.accuracy);
        self
    }

    pub fn is_finite(&self) -> bool {
        self.loss.is_finite()
    }
}

/// Every epoch of one training call, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingRunRecord {
    epochs: Vec<EpochMetrics>,
}

impl TrainingRunRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    pub fn epochs(&self) -> &[EpochMetrics] {
        &self.epochs
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    /// The first epoch whose loss was not finite, as a Divergence error.
    pub fn divergence(&self) -> Option<PipelineError> {
        self.epochs
            .iter()
            .find(|m| !m.is_finite())
            .map(|m| PipelineError::Divergence { epoch: m.epoch, loss: m.loss })
    }
}

/// Gradient update rule used by the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

impl OptimizerKind {
    /// Learning rate used when none is given
    pub fn default_learning_rate(&self) -> f64 {
        match self {
            OptimizerKind::Adam => 1e-3,
            OptimizerKind::Sgd => 1e-2,
        }
    }
}

/// Result of evaluating a model on one partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Mean categorical cross-entropy
    pub loss: f64,
    /// Fraction of samples whose argmax matches the label
    pub accuracy: f64,
    /// Number of samples evaluated
    pub samples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_append_only_and_ordered() {
        let mut record = TrainingRunRecord::new();
        record.push(EpochMetrics::new(1, 2.3, 0.1));
        record.push(EpochMetrics::new(2, 1.1, 0.6));

        assert_eq!(record.len(), 2);
        assert_eq!(record.epochs()[0].epoch, 1);
        assert_eq!(record.last().unwrap().accuracy, 0.6);
        assert!(record.divergence().is_none());
    }

    #[test]
    fn test_divergence_reports_first_bad_epoch() {
        let mut record = TrainingRunRecord::new();
        record.push(EpochMetrics::new(1, 2.3, 0.1));
        record.push(EpochMetrics::new(2, f64::NAN, 0.1));
        record.push(EpochMetrics::new(3, f64::INFINITY, 0.1));

        match record.divergence() {
            Some(PipelineError::Divergence { epoch, .. }) => assert_eq!(epoch, 2),
            other => panic!("expected divergence, got {other:?}"),
        }
    }

    #[test]
    fn test_with_validation_fills_both_fields() {
        let eval = Evaluation { loss: 0.4, accuracy: 0.9, samples: 10 };
        let m = EpochMetrics::new(1, 0.5, 0.8).with_validation(eval);
        assert_eq!(m.val_loss, Some(0.4));
        assert_eq!(m.val_accuracy, Some(0.9));
    }
}
