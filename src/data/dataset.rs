use burn::data::dataset::Dataset;

use crate::domain::text_line::LineSample;

/// In-memory dataset of preprocessed text-line samples.
pub struct LineDataset {
    samples: Vec<LineSample>,
}

impl LineDataset {
    pub fn new(samples: Vec<LineSample>) -> Self {
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<LineSample> for LineDataset {
    fn get(&self, index: usize) -> Option<LineSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: Vec<i64>) -> LineSample {
        LineSample {
            pixels: vec![0.0; 4],
            height: 2,
            width: 2,
            label,
        }
    }

    #[test]
    fn test_len_and_get() {
        let ds = LineDataset::new(vec![sample(vec![0]), sample(vec![1, 2])]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().label, vec![1, 2]);
        assert!(ds.get(2).is_none());
    }
}
