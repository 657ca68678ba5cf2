// ============================================================
// Layer 6 — Alphabet Store
// ============================================================
// Persists the character set next to the checkpoints so the
// class-index layout used at training time is the one used at
// inference time. A checkpoint loaded against a different
// alphabet would silently map every class to the wrong
// character — so the alphabet is saved once, up front, and
// reloaded rather than rebuilt.
//
// File: {checkpoint_dir}/charset.json — the ordered character
// list, serialized with serde so characters like space or tab
// survive the round trip intact.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::alphabet::Alphabet;

/// Saves and restores the alphabet used by a training run.
pub struct AlphabetStore {
    dir: PathBuf,
}

impl AlphabetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    fn charset_path(&self) -> PathBuf {
        self.dir.join("charset.json")
    }

    /// Load the saved alphabet if one exists, otherwise build it
    /// from the training transcripts and save it immediately.
    pub fn load_or_build(&self, transcripts: &[String]) -> Result<Alphabet> {
        if self.charset_path().exists() {
            let alphabet = self.load()?;
            tracing::info!(
                "Loaded alphabet with {} characters from '{}'",
                alphabet.chars().len(),
                self.charset_path().display()
            );
            return Ok(alphabet);
        }

        let alphabet = Alphabet::from_transcripts(transcripts.iter().map(String::as_str))?;
        self.save(&alphabet)?;
        tracing::info!(
            "Built alphabet with {} characters from {} transcripts",
            alphabet.chars().len(),
            transcripts.len()
        );
        Ok(alphabet)
    }

    pub fn save(&self, alphabet: &Alphabet) -> Result<()> {
        let json = serde_json::to_string_pretty(alphabet.chars())?;
        fs::write(self.charset_path(), json).with_context(|| {
            format!("Cannot write charset to '{}'", self.charset_path().display())
        })
    }

    pub fn load(&self) -> Result<Alphabet> {
        let json = fs::read_to_string(self.charset_path()).with_context(|| {
            format!(
                "Cannot read charset from '{}'. Make sure you have run 'train' first.",
                self.charset_path().display()
            )
        })?;
        let chars: Vec<char> = serde_json::from_str(&json)?;
        Alphabet::from_chars(chars)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> AlphabetStore {
        let dir = std::env::temp_dir().join(format!("crnn-ocr-charset-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        AlphabetStore::new(dir)
    }

    #[test]
    fn test_build_then_reload_preserves_layout() {
        let store = temp_store("reload");
        let built = store
            .load_or_build(&["ab c".to_string(), "ca".to_string()])
            .unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(built.chars(), loaded.chars());
        assert_eq!(built.blank(), loaded.blank());
    }

    #[test]
    fn test_existing_charset_wins_over_transcripts() {
        let store = temp_store("sticky");
        store
            .load_or_build(&["abc".to_string()])
            .unwrap();
        // Different corpus, same stored alphabet
        let again = store.load_or_build(&["xyz".to_string()]).unwrap();
        assert_eq!(again.chars(), &['a', 'b', 'c']);
    }
}
