// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`     — trains the CRNN on annotated line images
//   2. `recognize` — loads a checkpoint and transcribes an image

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use commands::{Commands, RecognizeArgs, TrainArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "crnn-ocr",
    version = "0.1.0",
    about = "Train a CRNN text recognizer with CTC, then transcribe line images."
)]
pub struct Cli {
    /// The subcommand to run (train or recognize)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => Self::run_train(args),
            Commands::Recognize(args) => Self::run_recognize(args),
        }
    }

    /// Handles the `train` subcommand.
    /// Converts CLI args into a TrainConfig and hands off to Layer 2.
    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on '{}'", args.annotation_file);

        let use_case = TrainUseCase::new(args.into());
        use_case.execute()?;

        println!("Training complete. Checkpoint saved.");
        Ok(())
    }

    /// Handles the `recognize` subcommand.
    /// Loads the model from checkpoint and prints the transcription.
    fn run_recognize(args: RecognizeArgs) -> Result<()> {
        use crate::application::recognize_use_case::RecognizeUseCase;
        use crate::domain::traits::TextRecognizer;

        let use_case = RecognizeUseCase::new(args.checkpoint_dir.clone())?;
        let text = use_case.recognize(Path::new(&args.image))?;
        println!("{}", text);
        Ok(())
    }
}
