// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `recognize`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the CRNN recognizer on annotated line images
    Train(TrainArgs),

    /// Transcribe a line image using a trained checkpoint
    Recognize(RecognizeArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Annotation file: one "image<TAB>transcript" per line,
    /// image paths relative to the file's directory
    #[arg(long, default_value = "data/annotations.txt")]
    pub annotation_file: String,

    /// Directory for checkpoints, charset, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Height every line image is resized to (divisible by 4)
    #[arg(long, default_value_t = 32)]
    pub image_height: usize,

    /// Width every line image is padded to (divisible by 4).
    /// The model emits one prediction per 4 pixel columns, which
    /// bounds the transcript length it can learn
    #[arg(long, default_value_t = 128)]
    pub image_width: usize,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Hidden width of the bidirectional LSTM
    #[arg(long, default_value_t = 256)]
    pub lstm_hidden: usize,

    /// Save a checkpoint every N epochs (epoch 0 always saves;
    /// a final checkpoint is written unconditionally)
    #[arg(long, default_value_t = 5)]
    pub save_frequency: usize,

    /// Fraction of samples held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            annotation_file: a.annotation_file,
            checkpoint_dir:  a.checkpoint_dir,
            image_height:    a.image_height,
            image_width:     a.image_width,
            batch_size:      a.batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            lstm_hidden:     a.lstm_hidden,
            save_frequency:  a.save_frequency,
            val_fraction:    a.val_fraction,
        }
    }
}

/// All arguments for the `recognize` command
#[derive(Args, Debug)]
pub struct RecognizeArgs {
    /// The line image to transcribe
    #[arg(long)]
    pub image: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}
