// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved per checkpoint:
//   1. Model weights (.mpk.gz file) — all learned parameters
//   2. latest_epoch.json            — which epoch was last saved
//   3. train_config.json            — run hyperparameters
//
// Why save the config separately?
//   When loading for inference, we need to know the exact model
//   shape (image size, hidden width) to rebuild the model before
//   loading the weights into it.
//
// File naming convention:
//   checkpoints/
//     model_epoch_0.mpk.gz   ← weights at epoch 0
//     model_epoch_5.mpk.gz   ← weights at epoch 5 (save_frequency 5)
//     ...
//     model_final.mpk.gz     ← written once after the last epoch,
//                              regardless of save_frequency
//     latest_epoch.json      ← number of the latest epoch snapshot
//     train_config.json      ← run hyperparameters
//     charset.json           ← written by the alphabet store
//     metrics.csv            ← written by the metrics logger
//
// A snapshot is due whenever `epoch % save_frequency == 0` —
// including epoch 0 — and the final save is unconditional, so a
// finished run always leaves an artifact even when save_frequency
// does not divide the last epoch index.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Crnn;

/// True when `epoch` should be snapshotted under the periodic rule.
pub fn checkpoint_due(epoch: usize, save_frequency: usize) -> bool {
    assert!(save_frequency > 0, "save_frequency must be positive");
    epoch % save_frequency == 0
}

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Save model weights for a given epoch and update the
    /// latest-epoch pointer.
    pub fn save_epoch<B: Backend>(&self, model: &Crnn<B>, epoch: usize) -> Result<()> {
        self.record(model, &format!("model_epoch_{epoch}"))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Save the unconditional end-of-run snapshot.
    pub fn save_final<B: Backend>(&self, model: &Crnn<B>) -> Result<()> {
        self.record(model, "model_final")?;
        tracing::debug!("Saved final checkpoint");
        Ok(())
    }

    fn record<B: Backend>(&self, model: &Crnn<B>, stem: &str) -> Result<()> {
        // Recorder appends the .mpk.gz extension itself
        let path = self.dir.join(stem);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))
    }

    /// Load weights into `model` from the best available snapshot:
    /// the final checkpoint when the run completed, otherwise the
    /// latest epoch snapshot.
    pub fn load_model<B: Backend>(
        &self,
        model: Crnn<B>,
        device: &B::Device,
    ) -> Result<Crnn<B>> {
        let stem = if self.dir.join("model_final.mpk.gz").exists() {
            "model_final".to_string()
        } else {
            format!("model_epoch_{}", self.latest_epoch()?)
        };
        let path = self.dir.join(&stem);
        tracing::info!("Loading checkpoint '{}'", path.display());

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    /// Save the training configuration to JSON.
    /// Called before training starts so inference can reconstruct
    /// the exact model architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration from JSON.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Read latest_epoch.json and return the epoch number.
    fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");
        let s = fs::read_to_string(&path)
            .with_context(|| "Cannot find 'latest_epoch.json'. Have you run 'train' first?")?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_due_at_epoch_zero() {
        assert!(checkpoint_due(0, 1));
        assert!(checkpoint_due(0, 5));
        assert!(checkpoint_due(0, 100));
    }

    #[test]
    fn test_checkpoint_due_follows_save_frequency() {
        assert!(checkpoint_due(10, 5));
        assert!(!checkpoint_due(11, 5));
        assert!(!checkpoint_due(4, 5));
        // frequency 1 → every epoch
        assert!(checkpoint_due(3, 1));
    }

    #[test]
    #[should_panic(expected = "save_frequency must be positive")]
    fn test_zero_save_frequency_panics() {
        checkpoint_due(1, 0);
    }

    #[test]
    fn test_config_round_trip() {
        let dir = std::env::temp_dir().join(format!("crnn-ocr-ckpt-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let manager = CheckpointManager::new(&dir);

        let cfg = TrainConfig::default();
        manager.save_config(&cfg).unwrap();
        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded.epochs, cfg.epochs);
        assert_eq!(loaded.image_width, cfg.image_width);
    }
}
