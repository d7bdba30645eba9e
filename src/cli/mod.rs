// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands off to Layer 2.
//
//   1. `train`    — train the RWA model, checkpoint at the end
//   2. `evaluate` — reload the checkpoint and report test cost
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "rwa-trainer",
    version = "0.1.0",
    about = "Train a Recurrent Weighted Average cell on the delayed copy problem."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case; nothing is computed here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => Self::run_train(args),
            Commands::Evaluate(args) => Self::run_evaluate(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        let dir = args.checkpoint_dir.clone();
        tracing::info!("Starting training, checkpoint directory: {}", dir);

        TrainUseCase::new(args.into()).execute()?;

        println!("Training complete. Checkpoint saved to '{}'.", dir);
        Ok(())
    }

    fn run_evaluate(args: EvaluateArgs) -> Result<()> {
        use crate::application::evaluate_use_case::EvaluateUseCase;

        let use_case = EvaluateUseCase::new(
            args.checkpoint_dir,
            args.batches,
            args.batch_size,
            args.seed,
        );
        let bits = use_case.execute()?;
        println!("Dataset: test Batches: {} Cost: {}", args.batches, bits);
        Ok(())
    }
}
