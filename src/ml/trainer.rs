// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Mini-batch training with Burn's DataLoader and Adam or SGD.
//
// Key points:
//   - Training runs on an AutodiffBackend so dropout is live
//     and loss.backward() has a graph to walk
//   - The loss is computed from logits with log_softmax, which
//     equals cross-entropy on the softmax output
//   - model.valid() gives an inner-backend copy in inference
//     mode for the per-epoch validation pass
//   - A NaN/inf epoch loss is warned about and recorded; the
//     record, not this loop, decides whether a run diverged
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use burn::{
    data::dataloader::DataLoaderBuilder,
    optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::DigitBatcher, dataset::DigitDataset, preprocessor::PreparedPartition};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::training::{EpochMetrics, OptimizerKind, TrainingRunRecord};
use crate::ml::evaluator::{check_compatible, evaluate};
use crate::ml::model::{cross_entropy, Mode, Model, Network};

/// Train `model` for `cfg.epochs` passes over `train_data`.
///
/// Returns the trained model (in Mode::Inference) and one EpochMetrics
/// per epoch. When `val_data` is given it is evaluated after every epoch.
pub fn train<B: AutodiffBackend>(
    model:      Model<B>,
    train_data: &PreparedPartition,
    val_data:   Option<&PreparedPartition>,
    cfg:        &TrainConfig,
) -> PipelineResult<(Model<B>, TrainingRunRecord)> {
    check_trainable(&model, train_data, val_data, cfg)?;

    match cfg.optimizer {
        // m = β1*m + (1-β1)*g        (mean)
        // v = β2*v + (1-β2)*g²       (variance)
        // θ = θ - lr * m / (√v + ε)  (update)
        OptimizerKind::Adam => {
            let optim = AdamConfig::new().with_epsilon(1e-7).init();
            train_loop(model, optim, train_data, val_data, cfg)
        }
        // θ = θ - lr * g
        OptimizerKind::Sgd => {
            let optim = SgdConfig::new().init();
            train_loop(model, optim, train_data, val_data, cfg)
        }
    }
}

fn check_trainable<B: Backend>(
    model:      &Model<B>,
    train_data: &PreparedPartition,
    val_data:   Option<&PreparedPartition>,
    cfg:        &TrainConfig,
) -> PipelineResult<()> {
    if cfg.epochs == 0 {
        return Err(PipelineError::InvalidConfig("epochs must be at least 1".into()));
    }
    if cfg.batch_size == 0 {
        return Err(PipelineError::InvalidConfig("batch size must be at least 1".into()));
    }
    if !(cfg.learning_rate.is_finite() && cfg.learning_rate > 0.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "learning rate must be positive, got {}",
            cfg.learning_rate
        )));
    }

    for partition in std::iter::once(train_data).chain(val_data) {
        if partition.is_empty() {
            return Err(PipelineError::data_unavailable(partition.name(), "partition has no samples"));
        }
        check_compatible(model, partition)?;
    }

    Ok(())
}

fn train_loop<B, O>(
    mut model:  Model<B>,
    mut optim:  O,
    train_data: &PreparedPartition,
    val_data:   Option<&PreparedPartition>,
    cfg:        &TrainConfig,
) -> PipelineResult<(Model<B>, TrainingRunRecord)>
where
    B: AutodiffBackend,
    O: Optimizer<Network<B>, B>,
{
    model.set_mode(Mode::Train);

    // ── Training data loader (AutodiffBackend, reshuffled every epoch) ────────
    let train_loader = DataLoaderBuilder::new(DigitBatcher::<B>::new(model.device().clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .build(DigitDataset::new(train_data.clone()));

    tracing::info!(
        "Training on '{}' ({} samples, batch size {}, {:?} lr={})",
        train_data.name(),
        train_data.len(),
        cfg.batch_size,
        cfg.optimizer,
        cfg.learning_rate
    );

    let mut record = TrainingRunRecord::new();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut samples  = 0usize;

        for batch in train_loader.iter() {
            let n = batch.len();
            let logits = model.forward_logits(batch.images, Mode::Train);
            let loss = cross_entropy(logits.clone(), batch.targets);

            let batch_loss: f64 = loss.clone().into_scalar().elem::<f64>();
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

            // Backward pass + optimizer update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, model.network());
            model = model.map_network(|network| optim.step(cfg.learning_rate, network, grads));
        }

        let mut metrics = EpochMetrics::new(
            epoch,
            loss_sum / samples as f64,
            correct as f64 / samples as f64,
        );

        // ── Validation phase (inner backend, dropout off) ─────────────────────
        if let Some(val_data) = val_data {
            metrics = metrics.with_validation(evaluate(&model.valid(), val_data, cfg.batch_size)?);
        }

        if !metrics.is_finite() {
            tracing::warn!("Epoch {epoch}: loss is {}, training has diverged", metrics.loss);
        }

        match (metrics.val_loss, metrics.val_accuracy) {
            (Some(val_loss), Some(val_accuracy)) => tracing::info!(
                "Epoch {:>3}/{} | loss={:.4} | acc={:.2}% | val_loss={:.4} | val_acc={:.2}%",
                epoch, cfg.epochs, metrics.loss, metrics.accuracy * 100.0,
                val_loss, val_accuracy * 100.0,
            ),
            _ => tracing::info!(
                "Epoch {:>3}/{} | loss={:.4} | acc={:.2}%",
                epoch, cfg.epochs, metrics.loss, metrics.accuracy * 100.0,
            ),
        }

        record.push(metrics);
    }

    tracing::info!("Training complete after {} epochs", record.len());
    Ok((model.with_mode(Mode::Inference), record))
}
