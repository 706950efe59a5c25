// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    — trains one model and saves its artifact
//   2. `evaluate` — loads an artifact and scores it on test data
//   3. `compare`  — trains both models and prints a table
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, CompareArgs, EvaluateArgs, TrainArgs};

use crate::ml::evaluator::ConfusionMatrix;

/// The main CLI struct — clap generates argument parsing
/// from the fields via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "digit-classifiers",
    version,
    about = "Train and compare a CNN and a linear classifier on MNIST digits."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Compare(args)  => run_compare(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let use_case = TrainUseCase::new(args.into());
    let outcome = use_case.execute()?;

    if let Some(last) = outcome.record.last() {
        println!("Final epoch: loss {:.4}, accuracy {:.2}%", last.loss, last.accuracy * 100.0);
    }
    println!(
        "Test: loss {:.4}, accuracy {:.2}% ({} samples)",
        outcome.test.loss,
        outcome.test.accuracy * 100.0,
        outcome.test.samples
    );
    println!("Model saved to {}", outcome.artifact.display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let outcome = EvaluateUseCase::new(args.into()).execute()?;
    println!(
        "{}: loss {:.4}, accuracy {:.2}% ({} samples)",
        outcome.model.name(),
        outcome.evaluation.loss,
        outcome.evaluation.accuracy * 100.0,
        outcome.evaluation.samples
    );

    if let Some(confusion) = &outcome.confusion {
        print_per_class(confusion);
    }
    Ok(())
}

fn run_compare(args: CompareArgs) -> Result<()> {
    use crate::application::compare_use_case::CompareUseCase;
    use crate::domain::architecture::ModelKind;

    // model and epochs are filled per run
    let base = args.run.to_config(ModelKind::Cnn);
    let report = CompareUseCase::new(base, args.run.epochs).execute()?;

    println!("\n{}", report.table());
    if let Some(best) = report.best() {
        println!("\nBest: {} ({:.2}%)", best.model.name(), best.test.accuracy * 100.0);
    }
    Ok(())
}

fn print_per_class(confusion: &ConfusionMatrix) {
    println!("\n{:>5} {:>8} {:>9}  most confused with", "digit", "support", "accuracy");
    for class in 0..confusion.num_classes() {
        let accuracy = confusion
            .class_accuracy(class)
            .map(|a| format!("{:.2}%", a * 100.0))
            .unwrap_or_else(|| "-".to_string());
        let confused = confusion
            .most_confused_with(class)
            .map(|(p, n)| format!("{p} ({n}×)"))
            .unwrap_or_default();
        println!("{class:>5} {:>8} {accuracy:>9}  {confused}", confusion.support(class));
    }
}
