// ============================================================
// Layer 3 — Text-Line Domain Types
// ============================================================
// A text line goes through two domain representations:
//
//   TextLine    — what the annotation file says: an image path
//                 and the ground-truth transcript
//   LineSample  — what the model consumes: preprocessed pixels
//                 and the encoded label sequence
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One annotated text line as listed in the annotation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    /// Path to the line image on disk
    pub image_path: PathBuf,

    /// The ground-truth transcription of the image
    pub transcript: String,
}

impl TextLine {
    pub fn new(image_path: impl Into<PathBuf>, transcript: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            transcript: transcript.into(),
        }
    }
}

/// One fully preprocessed and label-encoded training sample.
/// Pixels are grayscale, row-major, already normalized to [-1, 1]
/// at the fixed height × width the model expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSample {
    pub pixels: Vec<f32>,
    pub height: usize,
    pub width:  usize,

    /// Encoded transcript: class indices in [0, num_classes),
    /// never containing the blank or the padding sentinel
    pub label: Vec<i64>,
}
