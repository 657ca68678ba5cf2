// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::Path;

use crate::data::preprocessor::Preprocessor;
use crate::domain::alphabet::Alphabet;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::decoder::GreedyDecoder;
use crate::ml::model::{Crnn, CrnnConfig};

type InferBackend = burn::backend::Wgpu;

pub struct Inferencer {
    model:        Crnn<InferBackend>,
    preprocessor: Preprocessor,
    decoder:      GreedyDecoder,
    alphabet:     Alphabet,
    device:       burn::backend::wgpu::WgpuDevice,
}

impl Inferencer {
    /// Rebuild the trained model from its saved config and load
    /// the checkpoint weights into it.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        alphabet:     Alphabet,
    ) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        let cfg    = ckpt_manager.load_config()?;

        let model_cfg = CrnnConfig::new(
            alphabet.num_classes(),
            alphabet.blank(),
            cfg.image_height,
            cfg.image_width,
        )
        .with_lstm_hidden(cfg.lstm_hidden);
        let model: Crnn<InferBackend> = model_cfg.init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");

        Ok(Self {
            model,
            preprocessor: Preprocessor::new(cfg.image_height, cfg.image_width),
            decoder: GreedyDecoder::new(alphabet.blank()),
            alphabet,
            device,
        })
    }

    /// Transcribe a single line image on disk.
    pub fn recognize_file(&self, path: &Path) -> Result<String> {
        let image = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;

        let pixels = self.preprocessor.process(&image);
        let input = Tensor::<InferBackend, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([1, 1, self.preprocessor.height(), self.preprocessor.width()]);

        let log_probs = self.model.forward(input);
        let decoded = self.decoder.decode_batch(log_probs);
        Ok(self.alphabet.decode(&decoded[0]))
    }
}
