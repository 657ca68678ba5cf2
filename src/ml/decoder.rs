// ============================================================
// Layer 5 — Greedy (Best-Path) Decoder
// ============================================================
// Collapses per-timestep class distributions into a label
// sequence: arg-max class at every frame, merge consecutive
// duplicates, drop blanks.
//
// This is best-path decoding — it scores each frame
// independently instead of searching the alignment lattice the
// loss marginalizes over. A beam search over that lattice finds
// strictly-better sequences at a large constant-factor cost;
// greedy is the deliberate speed/accuracy trade-off for
// per-batch training metrics, where the exact mode of the
// distribution does not matter.

use burn::prelude::*;

/// Greedy best-path CTC decoder.
pub struct GreedyDecoder {
    /// Class index of the blank symbol — caller-defined, never
    /// assumed to be the first or last class.
    blank: i64,
}

impl GreedyDecoder {
    pub fn new(blank: usize) -> Self {
        Self {
            blank: blank as i64,
        }
    }

    /// Decode a batch of predictions `[batch, time, classes]`
    /// into one label sequence per batch element.
    ///
    /// Works on probabilities or log-probabilities alike — only
    /// the per-frame arg-max is used.
    pub fn decode_batch<B: Backend>(&self, predictions: Tensor<B, 3>) -> Vec<Vec<i64>> {
        let [batch_size, time_steps, _] = predictions.dims();
        let best = predictions.argmax(2).reshape([batch_size, time_steps]);
        let frames: Vec<i64> = best.into_data().iter::<i64>().collect();

        frames
            .chunks(time_steps)
            .map(|row| self.collapse(row))
            .collect()
    }

    /// Collapse one frame-level arg-max sequence: consecutive
    /// duplicates merge into a single occurrence, then blanks are
    /// dropped. A blank frame separates two genuine repeats, so
    /// "a a blank a" decodes to "a a".
    pub fn collapse(&self, frames: &[i64]) -> Vec<i64> {
        let mut output = Vec::new();
        let mut last = self.blank;
        for &tok in frames {
            if tok != last && tok != self.blank {
                output.push(tok);
            }
            last = tok;
        }
        output
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    /// Build a [1, T, C] prediction whose arg-max follows `frames`.
    fn one_hot_frames(frames: &[usize], classes: usize) -> Tensor<TestBackend, 3> {
        let mut data = vec![0.0_f32; frames.len() * classes];
        for (t, &c) in frames.iter().enumerate() {
            data[t * classes + c] = 1.0;
        }
        Tensor::from_data(
            TensorData::new(data, [1, frames.len(), classes]),
            &NdArrayDevice::Cpu,
        )
    }

    #[test]
    fn test_collapse_merges_repeats_and_drops_blanks() {
        let decoder = GreedyDecoder::new(0);
        // blank a a blank b b b → a b
        assert_eq!(decoder.collapse(&[0, 1, 1, 0, 2, 2, 2]), vec![1, 2]);
    }

    #[test]
    fn test_blank_separates_true_repeats() {
        let decoder = GreedyDecoder::new(0);
        // a a blank a → a a (the repeat survives exactly once)
        assert_eq!(decoder.collapse(&[1, 1, 0, 1]), vec![1, 1]);
    }

    #[test]
    fn test_all_blank_decodes_to_empty() {
        let decoder = GreedyDecoder::new(3);
        assert!(decoder.collapse(&[3, 3, 3, 3]).is_empty());
    }

    #[test]
    fn test_blank_index_is_configurable() {
        // Same frames, different blank conventions, different output.
        let frames = [2, 1, 1, 2, 0];
        assert_eq!(GreedyDecoder::new(2).collapse(&frames), vec![1, 0]);
        assert_eq!(GreedyDecoder::new(0).collapse(&frames), vec![2, 1, 2]);
    }

    #[test]
    fn test_decode_batch_follows_argmax() {
        // Dominant symbol per frame: b l a n k-collapsed sequence
        // must come out with duplicates merged exactly once each.
        let decoder = GreedyDecoder::new(4);
        let pred = one_hot_frames(&[1, 1, 4, 2, 2, 4], 5);
        assert_eq!(decoder.decode_batch(pred), vec![vec![1, 2]]);
    }
}
