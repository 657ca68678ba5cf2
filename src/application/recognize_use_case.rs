// ============================================================
// Layer 2 — RecognizeUseCase
// ============================================================
// Loads everything a trained run left behind — alphabet, config,
// checkpoint — and transcribes images with it.

use anyhow::Result;
use std::path::Path;

use crate::domain::traits::TextRecognizer;
use crate::infra::{alphabet_store::AlphabetStore, checkpoint::CheckpointManager};
use crate::ml::inferencer::Inferencer;

pub struct RecognizeUseCase {
    inferencer: Inferencer,
}

impl RecognizeUseCase {
    /// Restore the recognizer from a checkpoint directory.
    /// Fails with a pointed message when no training run has
    /// populated it yet.
    pub fn new(checkpoint_dir: impl Into<String>) -> Result<Self> {
        let checkpoint_dir = checkpoint_dir.into();
        let alphabet = AlphabetStore::new(&checkpoint_dir).load()?;
        let ckpt_manager = CheckpointManager::new(&checkpoint_dir);
        let inferencer = Inferencer::from_checkpoint(&ckpt_manager, alphabet)?;
        Ok(Self { inferencer })
    }
}

impl TextRecognizer for RecognizeUseCase {
    fn recognize(&self, image: &Path) -> Result<String> {
        self.inferencer.recognize_file(image)
    }
}
