// ============================================================
// Layer 3 — Alphabet (label encoding conventions)
// ============================================================
// Maps characters to integer class indices and back.
//
// Index layout convention (shared by every layer that touches
// labels — the batcher, the CTC loss, the decoder and the
// accuracy metric):
//
//   classes 0 .. chars.len()-1   → one class per character
//   class   chars.len()          → the CTC blank symbol
//   value   Alphabet::PAD (-1)   → padding sentinel in target rows
//
// The padding sentinel is deliberately a single shared constant
// and is outside the class range [0, num_classes), so a padded
// target row can never be confused with a real label or with the
// blank. Components strip padding with this constant only.
//
// Reference: Graves et al. (2006) CTC paper (blank symbol)

use anyhow::{bail, Result};
use std::collections::{BTreeSet, HashMap};

/// The character set of the recognizer plus the derived CTC
/// class-index conventions.
#[derive(Debug, Clone)]
pub struct Alphabet {
    /// Characters in class-index order — chars[i] has class index i
    chars: Vec<char>,

    /// Reverse lookup: character → class index
    index: HashMap<char, i64>,
}

impl Alphabet {
    /// Padding sentinel used in encoded target rows.
    /// Negative, so it can never collide with a class index.
    pub const PAD: i64 = -1;

    /// Build an alphabet from an explicit, ordered character list.
    /// Duplicate characters are rejected — the class mapping must
    /// be a bijection.
    pub fn from_chars(chars: Vec<char>) -> Result<Self> {
        let mut index = HashMap::with_capacity(chars.len());
        for (i, &c) in chars.iter().enumerate() {
            if index.insert(c, i as i64).is_some() {
                bail!("Duplicate character {:?} in alphabet", c);
            }
        }
        Ok(Self { chars, index })
    }

    /// Build an alphabet from training transcripts: the sorted set
    /// of every character that occurs. Sorting makes the class
    /// layout deterministic across runs on the same corpus.
    pub fn from_transcripts<'a>(transcripts: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let set: BTreeSet<char> = transcripts
            .into_iter()
            .flat_map(|t| t.chars())
            .collect();
        Self::from_chars(set.into_iter().collect())
    }

    /// Number of CTC classes: one per character plus the blank.
    pub fn num_classes(&self) -> usize {
        self.chars.len() + 1
    }

    /// Class index of the CTC blank symbol (the last class).
    pub fn blank(&self) -> usize {
        self.chars.len()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Encode a transcript into class indices.
    /// Fails on characters outside the alphabet — silently mapping
    /// them would corrupt the training signal.
    pub fn encode(&self, text: &str) -> Result<Vec<i64>> {
        text.chars()
            .map(|c| match self.index.get(&c) {
                Some(&i) => Ok(i),
                None => bail!("Character {:?} is not in the alphabet", c),
            })
            .collect()
    }

    /// Decode class indices back into a string.
    /// Blank and padding values are dropped; they are bookkeeping
    /// symbols, not characters.
    pub fn decode(&self, labels: &[i64]) -> String {
        labels
            .iter()
            .filter_map(|&l| usize::try_from(l).ok())
            .filter_map(|l| self.chars.get(l))
            .collect()
    }
}

/// Minimum number of timesteps a CTC alignment needs for `label`:
/// one frame per symbol, plus one mandatory blank frame between
/// each pair of consecutive repeated symbols.
pub fn min_alignment_steps(label: &[i64]) -> usize {
    let repeats = label.windows(2).filter(|w| w[0] == w[1]).count();
    label.len() + repeats
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Alphabet {
        Alphabet::from_chars(vec!['a', 'b', 'c']).unwrap()
    }

    #[test]
    fn test_class_layout() {
        let a = abc();
        // 3 characters + 1 blank
        assert_eq!(a.num_classes(), 4);
        // blank is the last class
        assert_eq!(a.blank(), 3);
        // padding sentinel is outside [0, num_classes)
        assert!(Alphabet::PAD < 0);
    }

    #[test]
    fn test_encode_decode() {
        let a = abc();
        assert_eq!(a.encode("cab").unwrap(), vec![2, 0, 1]);
        assert_eq!(a.decode(&[2, 0, 1]), "cab");
    }

    #[test]
    fn test_encode_unknown_char_fails() {
        let a = abc();
        assert!(a.encode("abz").is_err());
    }

    #[test]
    fn test_decode_drops_blank_and_padding() {
        let a = abc();
        let blank = a.blank() as i64;
        assert_eq!(a.decode(&[0, blank, 1, Alphabet::PAD]), "ab");
    }

    #[test]
    fn test_duplicate_chars_rejected() {
        assert!(Alphabet::from_chars(vec!['a', 'a']).is_err());
    }

    #[test]
    fn test_from_transcripts_is_sorted_and_deduped() {
        let a = Alphabet::from_transcripts(["ba", "ab"]).unwrap();
        assert_eq!(a.chars(), &['a', 'b']);
    }

    #[test]
    fn test_min_alignment_steps() {
        // no repeats: one frame per symbol
        assert_eq!(min_alignment_steps(&[1, 2, 3]), 3);
        // "33" needs a blank frame between the repeats
        assert_eq!(min_alignment_steps(&[3, 3]), 3);
        // "aab" → a,a repeat once
        assert_eq!(min_alignment_steps(&[0, 0, 1]), 4);
        assert_eq!(min_alignment_steps(&[]), 0);
    }
}
