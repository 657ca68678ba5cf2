// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Parse the annotation file   (Layer 4 - data)
//   Step 2: Build / load the alphabet   (Layer 6 - infra)
//   Step 3: Load + admit samples        (Layer 4 - data)
//   Step 4: Split train/validation      (Layer 4 - data)
//   Step 5: Build datasets              (Layer 4 - data)
//   Step 6: Save config                 (Layer 6 - infra)
//   Step 7: Run training loop           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::LineDataset,
    loader::AnnotationLoader,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::traits::SampleSource;
use crate::infra::{
    alphabet_store::AlphabetStore,
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
};
use crate::ml::model::CrnnConfig;
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved to disk and reloaded for inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub annotation_file: String,
    pub checkpoint_dir:  String,
    pub image_height:    usize,
    pub image_width:     usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub lstm_hidden:     usize,
    pub save_frequency:  usize,
    pub val_fraction:    f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            annotation_file: "data/annotations.txt".to_string(),
            checkpoint_dir:  "checkpoints".to_string(),
            image_height:    32,
            image_width:     128,
            batch_size:      32,
            epochs:          20,
            lr:              1e-3,
            lstm_hidden:     256,
            save_frequency:  5,
            val_fraction:    0.1,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        if cfg.epochs == 0 || cfg.batch_size == 0 || cfg.save_frequency == 0 {
            bail!("epochs, batch_size and save_frequency must all be positive");
        }

        // ── Step 1: Parse the annotation file ─────────────────────────────────
        tracing::info!("Reading annotations from '{}'", cfg.annotation_file);
        let loader = AnnotationLoader::new(&cfg.annotation_file);
        let lines  = loader.load_lines()?;
        if lines.is_empty() {
            bail!("Annotation file '{}' contains no samples", cfg.annotation_file);
        }

        // ── Step 2: Build / load the alphabet ─────────────────────────────────
        // The class layout must match between training runs and
        // inference, so it is persisted next to the checkpoints.
        let transcripts: Vec<String> =
            lines.iter().map(|l| l.transcript.clone()).collect();
        let alphabet_store = AlphabetStore::new(&cfg.checkpoint_dir);
        let alphabet = alphabet_store.load_or_build(&transcripts)?;

        // ── Step 3: Load images and admit samples ─────────────────────────────
        // time_steps bounds the label lengths the model can align;
        // longer transcripts are skipped by the loader.
        let time_steps = CrnnConfig::new(
            alphabet.num_classes(),
            alphabet.blank(),
            cfg.image_height,
            cfg.image_width,
        )
        .time_steps();
        let preprocessor = Preprocessor::new(cfg.image_height, cfg.image_width);
        let samples = loader.load_samples(&lines, &alphabet, &preprocessor, time_steps)?;
        if samples.is_empty() {
            bail!("No admissible training samples were loaded");
        }

        // ── Step 4: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) =
            split_train_val(samples, 1.0 - cfg.val_fraction);
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 5: Build Burn datasets ───────────────────────────────────────
        let train_dataset = LineDataset::new(train_samples);
        let val_dataset   = LineDataset::new(val_samples);

        // ── Step 6: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;
        let metrics_log = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        run_training(
            cfg,
            train_dataset,
            val_dataset,
            &alphabet,
            ckpt_manager,
            metrics_log,
        )?;

        Ok(())
    }
}
