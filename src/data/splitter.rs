// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Randomly shuffles samples and splits them into two sets:
//   - Training set:   used to update model weights
//   - Validation set: measures performance on unseen data,
//     so logged accuracy reflects generalization rather than
//     memorization
//
// Shuffling first matters because annotation files are often
// grouped by source document; without it the validation set
// would cover only one kind of line.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::seq::SliceRandom;

/// Randomly shuffle `samples` and split into (train, validation).
///
/// `train_fraction` is the proportion kept for training,
/// e.g. 0.9 = 90% train / 10% validation.
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64) -> (Vec<T>, Vec<T>) {
    let mut rng = rand::thread_rng();
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    // split_off(n) removes elements [n..] and returns them
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val)      = split_train_val(items, 0.9);
        assert_eq!(train.len(), 90);
        assert_eq!(val.len(),   10);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, val)      = split_train_val(items, 0.7);
        assert_eq!(train.len() + val.len(), 50);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, val)      = split_train_val(items, 0.8);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_full_training_split() {
        let items: Vec<usize> = (0..10).collect();
        let (train, val)      = split_train_val(items, 1.0);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }
}
