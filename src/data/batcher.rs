// ============================================================
// Layer 4 — Line Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<LineSample>
// into tensors, and performs the padding half of label encoding:
//
//   images:         [batch, 1, height, width]  float
//   targets:        [batch, max_label_len]     int, PAD-padded
//   target_lengths: [batch]                    int, true lengths
//
// Target rows are padded to the longest label IN THIS BATCH with
// Alphabet::PAD — the same sentinel the accuracy metric strips.
// The true lengths ride along explicitly because the CTC loss
// marginalizes per row over exactly that many symbols; it never
// reads the padded tail.
//
// Reference: Burn Book §4 (Batcher)

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::domain::alphabet::Alphabet;
use crate::domain::text_line::LineSample;

// ─── LineBatch ────────────────────────────────────────────────────────────────
/// A batch of text-line samples ready for the model forward pass.
/// All tensors have batch_size as their first dimension.
///
/// B is the Burn Backend (e.g. Wgpu, NdArray) —
/// generic so the same batcher works on any device.
#[derive(Debug, Clone)]
pub struct LineBatch<B: Backend> {
    /// Normalized grayscale images — shape: [batch, 1, height, width]
    pub images: Tensor<B, 4>,

    /// Encoded transcripts, PAD-padded — shape: [batch, max_label_len]
    pub targets: Tensor<B, 2, Int>,

    /// True (un-padded) label length per row — shape: [batch]
    pub target_lengths: Tensor<B, 1, Int>,
}

// ─── LineBatcher ──────────────────────────────────────────────────────────────
/// Stacks individual samples into one batch of tensors.
#[derive(Clone, Debug, Default)]
pub struct LineBatcher {}

impl LineBatcher {
    pub fn new() -> Self {
        Self {}
    }
}

impl<B: Backend> Batcher<B, LineSample, LineBatch<B>> for LineBatcher {
    fn batch(&self, items: Vec<LineSample>, device: &B::Device) -> LineBatch<B> {
        let batch_size = items.len();
        // All images share the same preprocessed shape
        let height = items[0].height;
        let width  = items[0].width;
        let max_len = items.iter().map(|s| s.label.len()).max().unwrap_or(0);

        // ── Flatten pixels ────────────────────────────────────────────────────
        let pixel_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        // ── Pad and flatten labels ────────────────────────────────────────────
        // Rows shorter than max_len get the PAD sentinel; the true
        // length is recorded separately.
        let mut target_flat: Vec<i32> = Vec::with_capacity(batch_size * max_len);
        let mut lengths: Vec<i32> = Vec::with_capacity(batch_size);
        for s in &items {
            lengths.push(s.label.len() as i32);
            target_flat.extend(s.label.iter().map(|&l| l as i32));
            target_flat.extend(std::iter::repeat(Alphabet::PAD as i32).take(max_len - s.label.len()));
        }

        // ── Create tensors ────────────────────────────────────────────────────
        let images = Tensor::<B, 1>::from_floats(pixel_flat.as_slice(), device)
            .reshape([batch_size, 1, height, width]);

        let targets = Tensor::<B, 1, Int>::from_ints(target_flat.as_slice(), device)
            .reshape([batch_size, max_len]);

        let target_lengths = Tensor::<B, 1, Int>::from_ints(lengths.as_slice(), device);

        LineBatch {
            images,
            targets,
            target_lengths,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn sample(label: Vec<i64>) -> LineSample {
        LineSample {
            pixels: vec![0.5; 2 * 4],
            height: 2,
            width: 4,
            label,
        }
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = LineBatcher::new();
        let batch: LineBatch<TestBackend> = batcher.batch(
            vec![sample(vec![1]), sample(vec![2, 3, 4])],
            &NdArrayDevice::Cpu,
        );
        assert_eq!(batch.images.dims(), [2, 1, 2, 4]);
        assert_eq!(batch.targets.dims(), [2, 3]);
        assert_eq!(batch.target_lengths.dims(), [2]);
    }

    #[test]
    fn test_targets_are_pad_padded_with_true_lengths() {
        let batcher = LineBatcher::new();
        let batch: LineBatch<TestBackend> = batcher.batch(
            vec![sample(vec![1]), sample(vec![2, 3, 4])],
            &NdArrayDevice::Cpu,
        );

        let targets: Vec<i64> = batch.targets.into_data().iter::<i64>().collect();
        let pad = Alphabet::PAD;
        assert_eq!(targets, vec![1, pad, pad, 2, 3, 4]);

        let lengths: Vec<i64> = batch.target_lengths.into_data().iter::<i64>().collect();
        assert_eq!(lengths, vec![1, 3]);
    }
}
