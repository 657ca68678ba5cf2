// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// By programming against traits instead of concrete types,
// we can swap implementations without changing the code
// that uses them. For example:
//   - AnnotationLoader implements SampleSource
//   - A future LmdbLoader could also implement SampleSource
//   - The application layer only sees SampleSource
//     and works with both without any changes
//
// This is the Dependency Inversion Principle from SOLID,
// applied using Rust's trait system.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::path::Path;

use crate::domain::text_line::TextLine;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can enumerate annotated text lines.
///
/// Implementations:
///   - AnnotationLoader → tab-separated annotation file + image dir
pub trait SampleSource {
    /// List every annotated line this source knows about.
    /// Image pixels are NOT loaded yet — that happens later,
    /// once the alphabet is known and samples can be admitted.
    fn load_lines(&self) -> Result<Vec<TextLine>>;
}

// ─── TextRecognizer ───────────────────────────────────────────────────────────
/// Any component that can transcribe a text-line image.
///
/// Implementations:
///   - RecognizeUseCase → CRNN forward pass + greedy CTC decoding
pub trait TextRecognizer {
    /// Given an image on disk, return the recognized text.
    fn recognize(&self, image: &Path) -> Result<String>;
}
