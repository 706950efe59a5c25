// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `evaluate`, `compare`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::evaluate_use_case::EvaluateConfig;
use crate::application::train_use_case::TrainConfig;
use crate::domain::architecture::ModelKind;
use crate::domain::training::OptimizerKind;

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train one model on MNIST and save it
    Train(TrainArgs),

    /// Evaluate a saved model on the MNIST test set
    Evaluate(EvaluateArgs),

    /// Train the CNN and the linear baseline and compare them
    Compare(CompareArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelArg {
    /// Two conv layers, max-pooling, dropout, two dense layers
    Cnn,
    /// A single dense layer with softmax (logistic regression)
    Linear,
}

impl From<ModelArg> for ModelKind {
    fn from(m: ModelArg) -> Self {
        match m {
            ModelArg::Cnn => ModelKind::Cnn,
            ModelArg::Linear => ModelKind::Linear,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerArg {
    Adam,
    Sgd,
}

impl From<OptimizerArg> for OptimizerKind {
    fn from(o: OptimizerArg) -> Self {
        match o {
            OptimizerArg::Adam => OptimizerKind::Adam,
            OptimizerArg::Sgd => OptimizerKind::Sgd,
        }
    }
}

/// Where the dataset comes from; shared by every command.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory caching the MNIST IDX files
    #[arg(long, default_value = "data/mnist")]
    pub data_dir: String,

    /// Fail instead of downloading missing IDX files
    #[arg(long)]
    pub no_download: bool,

    /// Use only the first N test images
    #[arg(long)]
    pub limit_test: Option<usize>,
}

/// Hyperparameters shared by `train` and `compare`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Directory for artifacts, train_config_<model>.json, and metrics.csv
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Number of full passes through the training data
    /// (default: 10 for cnn, 50 for linear)
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Number of samples processed together in one step
    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Gradient update rule
    #[arg(long, value_enum, default_value_t = OptimizerArg::Adam)]
    pub optimizer: OptimizerArg,

    /// Step size (default: 1e-3 for adam, 1e-2 for sgd)
    #[arg(long)]
    pub lr: Option<f64>,

    /// Seed for parameter initialization, shuffling, and splitting
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of the training images held out for validation
    #[arg(long, default_value_t = 0.0)]
    pub val_fraction: f64,

    /// Use only the first N training images
    #[arg(long)]
    pub limit_train: Option<usize>,

    /// Exit with an error if the loss becomes NaN or infinite
    #[arg(long)]
    pub abort_on_divergence: bool,
}

impl RunArgs {
    /// Application config for `model`; epochs fall back to the model default
    pub fn to_config(&self, model: ModelKind) -> TrainConfig {
        let optimizer = OptimizerKind::from(self.optimizer);
        TrainConfig {
            model,
            data_dir:            self.data.data_dir.clone(),
            artifact_dir:        self.artifact_dir.clone(),
            epochs:              self.epochs.unwrap_or(model.default_epochs()),
            batch_size:          self.batch_size,
            learning_rate:       self.lr.unwrap_or(optimizer.default_learning_rate()),
            optimizer,
            seed:                self.seed,
            val_fraction:        self.val_fraction,
            limit_train:         self.limit_train,
            limit_test:          self.data.limit_test,
            download:            !self.data.no_download,
            abort_on_divergence: self.abort_on_divergence,
        }
    }
}

/// All arguments for the `train` command
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Which model to train
    #[arg(long, value_enum, default_value_t = ModelArg::Cnn)]
    pub model: ModelArg,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        a.run.to_config(a.model.into())
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Which saved model to evaluate
    #[arg(long, value_enum, default_value_t = ModelArg::Cnn)]
    pub model: ModelArg,

    #[command(flatten)]
    pub data: DataArgs,

    /// Directory where `train` saved its artifacts
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Print accuracy and the most common confusion per digit
    #[arg(long)]
    pub per_class: bool,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            model:        a.model.into(),
            data_dir:     a.data.data_dir,
            artifact_dir: a.artifact_dir,
            batch_size:   a.batch_size,
            limit_test:   a.data.limit_test,
            download:     !a.data.no_download,
            per_class:    a.per_class,
        }
    }
}

/// All arguments for the `compare` command
#[derive(Args, Debug)]
pub struct CompareArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("digit-classifiers").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_train_defaults_follow_model() {
        let Commands::Train(args) = parse(&["train", "--model", "linear"]) else {
            panic!("expected train");
        };
        let cfg = TrainConfig::from(args);
        assert_eq!(cfg.model, ModelKind::Linear);
        assert_eq!(cfg.epochs, 50);
        assert_eq!(cfg.batch_size, 128);
        assert_eq!(cfg.learning_rate, 1e-3);
        assert!(cfg.download);
    }

    #[test]
    fn test_train_flags_override_defaults() {
        let Commands::Train(args) = parse(&[
            "train", "--epochs", "2", "--optimizer", "sgd", "--val-fraction", "0.1",
            "--limit-train", "500", "--no-download", "--abort-on-divergence",
        ]) else {
            panic!("expected train");
        };
        let cfg = TrainConfig::from(args);
        assert_eq!(cfg.model, ModelKind::Cnn);
        assert_eq!(cfg.epochs, 2);
        assert_eq!(cfg.optimizer, OptimizerKind::Sgd);
        assert_eq!(cfg.learning_rate, 1e-2);
        assert_eq!(cfg.val_fraction, 0.1);
        assert_eq!(cfg.limit_train, Some(500));
        assert!(!cfg.download);
        assert!(cfg.abort_on_divergence);
    }

    #[test]
    fn test_evaluate_args() {
        let Commands::Evaluate(args) = parse(&["evaluate", "--model", "linear", "--per-class"]) else {
            panic!("expected evaluate");
        };
        let cfg = EvaluateConfig::from(args);
        assert_eq!(cfg.model, ModelKind::Linear);
        assert!(cfg.per_class);
        assert_eq!(cfg.artifact_dir, "artifacts");
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let argv = ["digit-classifiers", "train", "--model", "rnn"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
