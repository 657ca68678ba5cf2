// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns an arbitrary line image into the fixed-shape float
// buffer the CRNN expects.
//
// Steps (applied in order):
//   1. Convert to 8-bit grayscale
//   2. Scale to the target height, preserving aspect ratio
//   3. Clamp the scaled width to the target width
//   4. Right-pad with white to the full target width
//      (text lines are left-aligned, so padding on the right
//       only adds trailing blank frames)
//   5. Normalize pixel values from [0, 255] to [-1, 1]
//
// The output buffer is row-major, height × width, one f32 per
// pixel — exactly what the batcher reshapes into [N, 1, H, W].

use image::imageops::FilterType;
use image::DynamicImage;

/// Background value used for right-padding, before normalization.
const PAD_PIXEL: f32 = 255.0;

/// Resizes and normalizes text-line images to a fixed shape.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    height: usize,
    width:  usize,
}

impl Preprocessor {
    pub fn new(height: usize, width: usize) -> Self {
        assert!(height > 0 && width > 0, "image dimensions must be positive");
        Self { height, width }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Preprocess one image into a normalized pixel buffer of
    /// exactly height × width values.
    pub fn process(&self, image: &DynamicImage) -> Vec<f32> {
        let gray = image.to_luma8();
        let (w, h) = gray.dimensions();

        // Scale to target height, keep aspect ratio, cap the width.
        // max(1) guards degenerate 1-pixel-wide inputs.
        let scaled_w = ((w as f32 * self.height as f32 / h.max(1) as f32).round() as u32)
            .clamp(1, self.width as u32);
        let resized = image::imageops::resize(
            &gray,
            scaled_w,
            self.height as u32,
            FilterType::Triangle,
        );

        // Copy into the fixed-size buffer, right-padded with white,
        // normalizing to [-1, 1] as we go.
        let mut pixels = vec![PAD_PIXEL / 127.5 - 1.0; self.height * self.width];
        for y in 0..self.height {
            for x in 0..scaled_w as usize {
                let value = resized.get_pixel(x as u32, y as u32)[0] as f32;
                pixels[y * self.width + x] = value / 127.5 - 1.0;
            }
        }
        pixels
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn solid_image(w: u32, h: u32, value: u8) -> DynamicImage {
        let img = GrayImage::from_pixel(w, h, Luma([value]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_output_shape_is_fixed() {
        let pre = Preprocessor::new(32, 128);
        for (w, h) in [(10, 10), (500, 17), (128, 32)] {
            let pixels = pre.process(&solid_image(w, h, 0));
            assert_eq!(pixels.len(), 32 * 128);
        }
    }

    #[test]
    fn test_values_are_normalized() {
        let pre = Preprocessor::new(8, 16);
        let pixels = pre.process(&solid_image(16, 8, 0));
        // black → -1, and every value stays inside [-1, 1]
        assert!((pixels[0] + 1.0).abs() < 1e-6);
        assert!(pixels.iter().all(|p| (-1.0..=1.0).contains(p)));
    }

    #[test]
    fn test_narrow_image_is_right_padded_with_white() {
        let pre = Preprocessor::new(8, 32);
        // 8×8 black square scales to 8×8, columns 8.. are padding
        let pixels = pre.process(&solid_image(8, 8, 0));
        let white = 255.0 / 127.5 - 1.0;
        assert!((pixels[0] + 1.0).abs() < 1e-6);
        assert!((pixels[31] - white).abs() < 1e-6);
    }
}
