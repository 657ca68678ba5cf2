// ============================================================
// Layer 4 — Annotation Loader
// ============================================================
// Loads annotated text lines from a plain UTF-8 annotation file:
//
//   relative/path/to/line1.png<TAB>the transcription
//   relative/path/to/line2.png<TAB>another line
//
// Image paths are resolved relative to the annotation file's
// directory. Parsing is strict (a line without a tab is an
// error), but sample ADMISSION is lenient: a line whose image
// cannot be decoded, whose transcript contains characters
// outside the alphabet, or whose label cannot fit the model's
// output width is skipped with a warning instead of aborting
// the whole run.
//
// The CTC fit rule: a label of length L with R consecutive
// repeats needs at least L + R timesteps (a blank must separate
// repeated symbols), so a sample whose transcript is too long
// for the model's sequence length can never be learned and is
// rejected here, up front.
//
// Reference: Rust Book §9 (Error Handling)
//            Graves et al. (2006) CTC paper

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::alphabet::{min_alignment_steps, Alphabet};
use crate::domain::text_line::{LineSample, TextLine};
use crate::domain::traits::SampleSource;

/// Loads annotated line images listed in a tab-separated file.
pub struct AnnotationLoader {
    /// Path to the annotation file
    annotation_file: PathBuf,

    /// Directory that image paths are resolved against
    image_root: PathBuf,
}

impl AnnotationLoader {
    /// Create a loader for the given annotation file.
    /// Images are resolved relative to the file's directory.
    pub fn new(annotation_file: impl Into<PathBuf>) -> Self {
        let annotation_file = annotation_file.into();
        let image_root = annotation_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            annotation_file,
            image_root,
        }
    }

    /// Load, preprocess and label-encode every admissible sample.
    ///
    /// `time_steps` is the model's output sequence length; samples
    /// whose label cannot be aligned within it are skipped.
    pub fn load_samples(
        &self,
        lines: &[TextLine],
        alphabet: &Alphabet,
        preprocessor: &Preprocessor,
        time_steps: usize,
    ) -> Result<Vec<LineSample>> {
        let mut samples = Vec::with_capacity(lines.len());
        let mut skipped = 0usize;

        for line in lines {
            match self.load_single(line, alphabet, preprocessor, time_steps) {
                Ok(sample) => samples.push(sample),
                // Log a warning but continue — don't fail on one bad line
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Skipping '{}': {}", line.image_path.display(), e);
                }
            }
        }

        tracing::info!(
            "Loaded {} samples ({} skipped)",
            samples.len(),
            skipped
        );
        Ok(samples)
    }

    fn load_single(
        &self,
        line: &TextLine,
        alphabet: &Alphabet,
        preprocessor: &Preprocessor,
        time_steps: usize,
    ) -> Result<LineSample> {
        let label = alphabet.encode(&line.transcript)?;
        if label.is_empty() {
            bail!("Empty transcript");
        }
        let needed = min_alignment_steps(&label);
        if needed > time_steps {
            bail!(
                "Label needs {} timesteps but the model produces only {}",
                needed,
                time_steps
            );
        }

        let path = self.image_root.join(&line.image_path);
        let image = image::open(&path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;

        Ok(LineSample {
            pixels: preprocessor.process(&image),
            height: preprocessor.height(),
            width:  preprocessor.width(),
            label,
        })
    }
}

impl SampleSource for AnnotationLoader {
    fn load_lines(&self) -> Result<Vec<TextLine>> {
        let text = fs::read_to_string(&self.annotation_file).with_context(|| {
            format!(
                "Cannot read annotation file '{}'",
                self.annotation_file.display()
            )
        })?;

        let mut lines = Vec::new();
        for (lineno, raw) in text.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            // Split on the FIRST tab only — transcripts are free to
            // contain further tabs and spaces.
            let Some((path, transcript)) = raw.split_once('\t') else {
                bail!(
                    "{}:{}: expected '<image>\\t<transcript>'",
                    self.annotation_file.display(),
                    lineno + 1
                );
            };
            lines.push(TextLine::new(path.trim(), transcript));
        }

        tracing::info!(
            "Parsed {} annotated lines from '{}'",
            lines.len(),
            self.annotation_file.display()
        );
        Ok(lines)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_annotations(tag: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "crnn-ocr-loader-{tag}-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("annotations.txt");
        let mut f = fs::File::create(&path).unwrap();
        write!(f, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_parse_annotation_lines() {
        let path = write_annotations("parse", "a.png\thello\n\nb.png\tworld x\n");
        let loader = AnnotationLoader::new(&path);
        let lines = loader.load_lines().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].image_path, PathBuf::from("a.png"));
        assert_eq!(lines[0].transcript, "hello");
        assert_eq!(lines[1].transcript, "world x");
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        let path = write_annotations("malformed", "no-tab-here\n");
        let loader = AnnotationLoader::new(&path);
        assert!(loader.load_lines().is_err());
    }

    #[test]
    fn test_inadmissible_samples_are_skipped_not_fatal() {
        // Image files don't exist, so every sample is skipped —
        // but load_samples itself succeeds.
        let path = write_annotations("admit", "missing.png\tab\n");
        let loader = AnnotationLoader::new(&path);
        let lines = loader.load_lines().unwrap();
        let alphabet = Alphabet::from_chars(vec!['a', 'b']).unwrap();
        let pre = Preprocessor::new(8, 32);
        let samples = loader.load_samples(&lines, &alphabet, &pre, 8).unwrap();
        assert!(samples.is_empty());
    }
}
