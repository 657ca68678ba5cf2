// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two concerns live here:
//
//   RunningMean   — the per-epoch accumulator behind every
//                   logged figure. An explicit (sum, count)
//                   state object owned by the orchestrator,
//                   reset at every epoch boundary. No hidden
//                   globals: whoever owns the accumulator
//                   controls its lifecycle.
//
//   MetricsLogger — appends one CSV row per epoch so learning
//                   curves can be plotted after the run.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (0, 1, 2, ...)
//   - train_loss: mean CTC loss over training batches
//   - train_acc:  mean sequence accuracy over training batches
//   - val_loss:   mean CTC loss over validation batches
//   - val_acc:    mean sequence accuracy over validation batches
//
// Output file: {checkpoint_dir}/metrics.csv

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

// ─── RunningMean ──────────────────────────────────────────────────────────────
/// Mean accumulator: feed it per-batch values, read the running
/// mean at any point, reset it at epoch boundaries.
#[derive(Debug, Clone, Default)]
pub struct RunningMean {
    sum:   f64,
    count: usize,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the mean. A NaN value propagates
    /// into the result — numerical blow-ups stay visible in the
    /// logs rather than being silently dropped.
    pub fn update(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Current mean, or 0.0 before the first observation.
    pub fn result(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Back to zero state — no value or count carries over.
    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}

// ─── EpochMetrics ─────────────────────────────────────────────────────────────
/// One row of metrics data for a single training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    pub train_acc:  f64,
    pub val_loss:   f64,
    pub val_acc:    f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:      usize,
        train_loss: f64,
        train_acc:  f64,
        val_loss:   f64,
        val_acc:    f64,
    ) -> Self {
        Self { epoch, train_loss, train_acc, val_loss, val_acc }
    }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet, so a
    /// resumed run appends below the earlier epochs.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,train_acc,val_loss,val_acc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.train_acc, m.val_loss, m.val_acc,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mut m = RunningMean::new();
        assert_eq!(m.result(), 0.0);
        m.update(2.0);
        m.update(4.0);
        assert_eq!(m.result(), 3.0);
    }

    #[test]
    fn test_reset_returns_to_zero_state() {
        let mut m = RunningMean::new();
        m.update(7.5);
        m.reset();
        // No carry-over of value or count into the next epoch
        assert_eq!(m.result(), 0.0);
        m.update(1.0);
        assert_eq!(m.result(), 1.0);
    }

    #[test]
    fn test_nan_stays_visible() {
        let mut m = RunningMean::new();
        m.update(1.0);
        m.update(f64::NAN);
        assert!(m.result().is_nan());
    }

    #[test]
    fn test_logger_writes_header_and_rows() {
        let dir = std::env::temp_dir().join(format!("crnn-ocr-metrics-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let logger = MetricsLogger::new(&dir).unwrap();
        logger
            .log(&EpochMetrics::new(0, 1.5, 0.25, 1.8, 0.2))
            .unwrap();

        let content = fs::read_to_string(logger.csv_path()).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "epoch,train_loss,train_acc,val_loss,val_acc"
        );
        assert!(lines.next().unwrap().starts_with("0,1.5"));
    }
}
