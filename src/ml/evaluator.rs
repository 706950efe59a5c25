// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Measures a model on a prepared partition without touching it:
//
//   - loss:     mean categorical cross-entropy over every sample
//   - accuracy: fraction of argmax predictions equal to the label
//
// Batches are visited in order by a single-threaded loader with
// no shuffling, and dropout is off (Mode::Inference), so two
// evaluations of the same model on the same data are identical.
//
// Reference: Burn Book §5 (Training: validation step)

use burn::{data::dataloader::DataLoaderBuilder, prelude::*};

use crate::data::{batcher::DigitBatcher, dataset::DigitDataset, preprocessor::PreparedPartition};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::image::Label;
use crate::domain::training::Evaluation;
use crate::ml::model::{cross_entropy, Mode, Model};

/// Fail with ShapeMismatch unless `partition` was prepared for the
/// model's input layout and class count.
pub(crate) fn check_compatible<B: Backend>(
    model:     &Model<B>,
    partition: &PreparedPartition,
) -> PipelineResult<()> {
    let input = model.architecture().input_shape;
    if model.architecture().input_layout() != Some(partition.layout())
        || input.num_elements() != partition.sample_shape().num_elements()
    {
        return Err(PipelineError::shape_mismatch(
            format!("samples shaped {input}"),
            format!("'{}' prepared as {}", partition.name(), partition.sample_shape()),
        ));
    }

    if model.num_classes() != partition.num_classes() {
        return Err(PipelineError::shape_mismatch(
            format!("{} classes", model.num_classes()),
            format!("'{}' encoded with {} classes", partition.name(), partition.num_classes()),
        ));
    }

    Ok(())
}

fn check_evaluable<B: Backend>(
    model:      &Model<B>,
    partition:  &PreparedPartition,
    batch_size: usize,
) -> PipelineResult<()> {
    if batch_size == 0 {
        return Err(PipelineError::InvalidConfig("batch size must be at least 1".into()));
    }
    if partition.is_empty() {
        return Err(PipelineError::data_unavailable(partition.name(), "partition has no samples"));
    }
    check_compatible(model, partition)
}

/// Mean loss and accuracy of `model` on `partition`, in inference mode.
pub fn evaluate<B: Backend>(
    model:      &Model<B>,
    partition:  &PreparedPartition,
    batch_size: usize,
) -> PipelineResult<Evaluation> {
    check_evaluable(model, partition, batch_size)?;

    let loader = DataLoaderBuilder::new(DigitBatcher::<B>::new(model.device().clone()))
        .batch_size(batch_size)
        .build(DigitDataset::new(partition.clone()));

    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut samples  = 0usize;

    for batch in loader.iter() {
        let n = batch.len();
        let logits = model.forward_logits(batch.images, Mode::Inference);

        let batch_loss: f64 = cross_entropy(logits.clone(), batch.targets)
            .into_scalar()
            .elem::<f64>();

        // argmax(1) is [batch, 1]; flatten to [batch] before comparing
        let batch_correct: i64 = logits
            .argmax(1)
            .flatten::<1>(0, 1)
            .equal(batch.labels)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();

        loss_sum += batch_loss * n as f64;
        correct  += batch_correct as usize;
        samples  += n;
    }

    let evaluation = Evaluation {
        loss:     loss_sum / samples as f64,
        accuracy: correct as f64 / samples as f64,
        samples,
    };

    tracing::debug!(
        "Evaluated '{}': loss={:.4} accuracy={:.4} ({} samples)",
        partition.name(),
        evaluation.loss,
        evaluation.accuracy,
        samples
    );

    Ok(evaluation)
}

/// Argmax class of every sample in `partition`, in order.
pub fn predict<B: Backend>(
    model:      &Model<B>,
    partition:  &PreparedPartition,
    batch_size: usize,
) -> PipelineResult<Vec<Label>> {
    check_evaluable(model, partition, batch_size)?;

    let loader = DataLoaderBuilder::new(DigitBatcher::<B>::new(model.device().clone()))
        .batch_size(batch_size)
        .build(DigitDataset::new(partition.clone()));

    let mut predictions = Vec::with_capacity(partition.len());
    for batch in loader.iter() {
        let classes = model
            .infer(batch.images)
            .argmax(1)
            .flatten::<1>(0, 1)
            .into_data();
        predictions.extend(classes.iter::<i64>().map(|c| c as Label));
    }

    Ok(predictions)
}

// ─── ConfusionMatrix ──────────────────────────────────────────────────────────
/// counts[actual][predicted]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Tally aligned predictions and labels. Fails with ShapeMismatch
    /// when the lengths differ or a class id is out of range.
    pub fn from_predictions(
        predictions: &[Label],
        labels:      &[Label],
        num_classes: usize,
    ) -> PipelineResult<Self> {
        if predictions.len() != labels.len() {
            return Err(PipelineError::shape_mismatch(
                format!("{} predictions", labels.len()),
                format!("{} predictions", predictions.len()),
            ));
        }

        let mut counts = vec![vec![0; num_classes]; num_classes];
        for (&predicted, &actual) in predictions.iter().zip(labels) {
            let (p, a) = (predicted as usize, actual as usize);
            if p >= num_classes || a >= num_classes {
                return Err(PipelineError::shape_mismatch(
                    format!("class ids below {num_classes}"),
                    format!("predicted {p}, actual {a}"),
                ));
            }
            counts[a][p] += 1;
        }

        Ok(Self { counts })
    }

    pub fn num_classes(&self) -> usize {
        self.counts.len()
    }

    #[cfg(test)]
    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    /// Samples whose true class is `class`
    pub fn support(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.num_classes()).map(|c| self.counts[c][c]).sum();
        correct as f64 / self.total().max(1) as f64
    }

    /// Recall of one class; None when the class never occurs.
    pub fn class_accuracy(&self, class: usize) -> Option<f64> {
        match self.support(class) {
            0 => None,
            n => Some(self.counts[class][class] as f64 / n as f64),
        }
    }

    /// The most frequent wrong prediction for `class`, if any.
    pub fn most_confused_with(&self, class: usize) -> Option<(usize, usize)> {
        self.counts[class]
            .iter()
            .enumerate()
            .filter(|&(p, &n)| p != class && n > 0)
            .max_by_key(|&(_, &n)| n)
            .map(|(p, &n)| (p, n))
    }
}
