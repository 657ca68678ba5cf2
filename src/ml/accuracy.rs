// ============================================================
// Layer 5 — Sequence Accuracy Metric
// ============================================================
// Fraction of batch elements whose decoded label sequence
// exactly equals the ground truth — whole-sequence equality,
// not per-character edit distance. A single wrong, missing or
// extra symbol makes the element count as wrong.
//
// Ground-truth rows arrive PADDED (the batcher pads to the
// longest label in the batch with Alphabet::PAD); the padding is
// stripped here with that same shared constant. Encoder and
// metric agreeing on one sentinel is a hard correctness
// requirement — comparing against un-stripped rows would score
// everything as wrong.
//
// Pure functions of their inputs: the running epoch averages
// live in the orchestrator's accumulators, not here.

use crate::domain::alphabet::Alphabet;

/// The valid prefix of a padded target row: everything before the
/// first PAD sentinel.
pub fn strip_padding(row: &[i64]) -> &[i64] {
    let end = row
        .iter()
        .position(|&v| v == Alphabet::PAD)
        .unwrap_or(row.len());
    &row[..end]
}

/// Exact-match accuracy over one batch, in [0.0, 1.0].
///
/// `decoded` holds blank/repeat-collapsed label sequences;
/// `padded_truths` holds PAD-padded target rows.
///
/// # Panics
/// If the two slices disagree in length — a malformed batch is a
/// fatal error, not something to score around.
pub fn batch_accuracy(decoded: &[Vec<i64>], padded_truths: &[Vec<i64>]) -> f64 {
    assert_eq!(
        decoded.len(),
        padded_truths.len(),
        "decoded count {} must equal truth count {}",
        decoded.len(),
        padded_truths.len()
    );
    if decoded.is_empty() {
        return 0.0;
    }

    let correct = decoded
        .iter()
        .zip(padded_truths)
        .filter(|(d, t)| d.as_slice() == strip_padding(t))
        .count();

    correct as f64 / decoded.len() as f64
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const PAD: i64 = Alphabet::PAD;

    #[test]
    fn test_strip_padding() {
        assert_eq!(strip_padding(&[1, 2, PAD, PAD]), &[1, 2]);
        assert_eq!(strip_padding(&[1, 2, 3]), &[1, 2, 3]);
        assert_eq!(strip_padding(&[PAD, PAD]), &[] as &[i64]);
    }

    #[test]
    fn test_all_correct_scores_one() {
        let decoded = vec![vec![1, 2], vec![3, 3]];
        let truths = vec![vec![1, 2, PAD], vec![3, 3, PAD]];
        assert_eq!(batch_accuracy(&decoded, &truths), 1.0);
    }

    #[test]
    fn test_none_correct_scores_zero() {
        let decoded = vec![vec![2, 1], vec![]];
        let truths = vec![vec![1, 2], vec![3, 3]];
        assert_eq!(batch_accuracy(&decoded, &truths), 0.0);
    }

    #[test]
    fn test_partial_match_is_fractional() {
        let decoded = vec![vec![1], vec![2], vec![9], vec![4]];
        let truths = vec![vec![1, PAD], vec![2, PAD], vec![3, PAD], vec![4, PAD]];
        assert_eq!(batch_accuracy(&decoded, &truths), 0.5);
    }

    #[test]
    fn test_prefix_is_not_a_match() {
        // Decoded [1] vs truth [1, 2] — sequence equality, not prefix
        let decoded = vec![vec![1]];
        let truths = vec![vec![1, 2]];
        assert_eq!(batch_accuracy(&decoded, &truths), 0.0);
    }

    #[test]
    #[should_panic(expected = "must equal truth count")]
    fn test_length_mismatch_panics() {
        batch_accuracy(&[vec![1]], &[]);
    }
}
