// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Drives the full train + validation protocol, epoch by epoch:
//
//   for each epoch:
//     for each training batch:
//       forward (autodiff) → CTC loss → backward → Adam step
//       greedy decode → sequence accuracy → running means
//       progress line
//     for each validation batch:
//       forward only (no gradients, no updates) → loss + accuracy
//     epoch summary + CSV row
//     reset all four accumulators
//     checkpoint if epoch % save_frequency == 0
//   final checkpoint, unconditionally
//
// Training runs on Autodiff<Wgpu>; model.valid() strips the
// autodiff wrapper so validation batches pay no gradient-tape
// cost and measure generalization with the exact same pipeline.
//
// Failures are not caught here: a malformed batch or an I/O
// error on checkpoint save propagates out and aborts the run.
// A NaN loss does NOT abort — it flows into the running mean
// where the operator can see it.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{LineBatch, LineBatcher},
    dataset::LineDataset,
};
use crate::domain::alphabet::Alphabet;
use crate::infra::checkpoint::{checkpoint_due, CheckpointManager};
use crate::infra::metrics::{EpochMetrics, MetricsLogger, RunningMean};
use crate::ml::accuracy::batch_accuracy;
use crate::ml::decoder::GreedyDecoder;
use crate::ml::model::{Crnn, CrnnConfig};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: LineDataset,
    val_dataset:   LineDataset,
    alphabet:      &Alphabet,
    ckpt_manager:  CheckpointManager,
    metrics_log:   MetricsLogger,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop(cfg, train_dataset, val_dataset, alphabet, ckpt_manager, metrics_log, device)
}

fn train_loop(
    cfg:           &TrainConfig,
    train_dataset: LineDataset,
    val_dataset:   LineDataset,
    alphabet:      &Alphabet,
    ckpt_manager:  CheckpointManager,
    metrics_log:   MetricsLogger,
    device:        burn::backend::wgpu::WgpuDevice,
) -> Result<()> {

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = CrnnConfig::new(
        alphabet.num_classes(),
        alphabet.blank(),
        cfg.image_height,
        cfg.image_width,
    )
    .with_lstm_hidden(cfg.lstm_hidden);
    let mut model: Crnn<MyBackend> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} classes (blank {}), {} timesteps",
        alphabet.num_classes(),
        alphabet.blank(),
        model_cfg.time_steps(),
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // Adaptive per-parameter learning rate:
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim_cfg = AdamConfig::new().with_epsilon(1e-8);
    let mut optim = optim_cfg.init();

    // ── Decoder for the per-batch accuracy figures ────────────────────────────
    let decoder = GreedyDecoder::new(alphabet.blank());

    let train_size = train_dataset.sample_count();
    let steps_per_epoch = train_size.div_ceil(cfg.batch_size);

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::<MyBackend, _, _>::new(LineBatcher::new())
        .batch_size(cfg.batch_size)
        .shuffle(42)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_loader = DataLoaderBuilder::<MyInnerBackend, _, _>::new(LineBatcher::new())
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    // ── Running metric accumulators ───────────────────────────────────────────
    // Owned here, reset at every epoch boundary — nothing carries
    // over between epochs.
    let mut train_loss_metric = RunningMean::new();
    let mut train_accuracy    = RunningMean::new();
    let mut val_loss_metric   = RunningMean::new();
    let mut val_accuracy      = RunningMean::new();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        for (step, batch) in train_loader.iter().enumerate() {
            let (loss, log_probs) = model.forward_loss(
                batch.images,
                batch.targets.clone(),
                batch.target_lengths,
            );

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_metric.update(loss_val);

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);

            // Score this batch with the same predictions we trained on
            let decoded = decoder.decode_batch(log_probs);
            let truths  = target_rows(batch.targets);
            let acc = batch_accuracy(&decoded, &truths);
            train_accuracy.update(acc);

            println!(
                "Epoch {:>3}/{} | step {:>4}/{} | loss={:.4} | acc={:.3}",
                epoch,
                cfg.epochs,
                step + 1,
                steps_per_epoch,
                train_loss_metric.result(),
                train_accuracy.result(),
            );
        }

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → Crnn<MyInnerBackend>; inference-only
        // forward pass, no gradient recording, no parameter updates
        let model_valid = model.valid();

        for batch in val_loader.iter() {
            let (loss, acc) = eval_batch(&model_valid, &decoder, batch);
            val_loss_metric.update(loss);
            val_accuracy.update(acc);
        }

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | train_acc={:.3} | val_loss={:.4} | val_acc={:.3}",
            epoch,
            cfg.epochs,
            train_loss_metric.result(),
            train_accuracy.result(),
            val_loss_metric.result(),
            val_accuracy.result(),
        );

        metrics_log.log(&EpochMetrics::new(
            epoch,
            train_loss_metric.result(),
            train_accuracy.result(),
            val_loss_metric.result(),
            val_accuracy.result(),
        ))?;

        // ── Epoch boundary: reset every accumulator ───────────────────────────
        train_loss_metric.reset();
        train_accuracy.reset();
        val_loss_metric.reset();
        val_accuracy.reset();

        if checkpoint_due(epoch, cfg.save_frequency) {
            ckpt_manager.save_epoch(&model, epoch)?;
            tracing::info!("Checkpoint saved for epoch {}", epoch);
        }
    }

    // One last snapshot regardless of save_frequency, so a finished
    // run always leaves a final artifact.
    ckpt_manager.save_final(&model)?;
    tracing::info!("Training complete!");
    Ok(())
}

/// Loss and accuracy for one inference-only batch.
fn eval_batch<B: Backend>(
    model: &Crnn<B>,
    decoder: &GreedyDecoder,
    batch: LineBatch<B>,
) -> (f64, f64) {
    let (loss, log_probs) = model.forward_loss(
        batch.images,
        batch.targets.clone(),
        batch.target_lengths,
    );
    let loss_val: f64 = loss.into_scalar().elem::<f64>();

    let decoded = decoder.decode_batch(log_probs);
    let truths  = target_rows(batch.targets);
    (loss_val, batch_accuracy(&decoded, &truths))
}

/// Padded target tensor [batch, max_len] → one Vec per row.
fn target_rows<B: Backend>(targets: Tensor<B, 2, Int>) -> Vec<Vec<i64>> {
    let [_, max_len] = targets.dims();
    let flat: Vec<i64> = targets.into_data().iter::<i64>().collect();
    if max_len == 0 {
        return Vec::new();
    }
    flat.chunks(max_len).map(<[i64]>::to_vec).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::ctc_loss::CtcLossConfig;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_target_rows_splits_and_preserves_padding() {
        let device = NdArrayDevice::Cpu;
        let targets =
            Tensor::<TestBackend, 2, Int>::from_data([[1, 2, -1], [3, 3, -1]], &device);
        let rows = target_rows(targets);
        assert_eq!(rows, vec![vec![1, 2, -1], vec![3, 3, -1]]);
    }

    /// Predictions shaped [batch, time, classes] whose arg-max
    /// follows the given frame sequences, with `hot` probability
    /// on the dominant class.
    fn frame_predictions(
        frames: &[&[usize]],
        classes: usize,
        hot: f32,
        device: &NdArrayDevice,
    ) -> Tensor<TestBackend, 3> {
        let time = frames[0].len();
        let cold = (1.0 - hot) / (classes - 1) as f32;
        let mut data = Vec::with_capacity(frames.len() * time * classes);
        for row in frames {
            for &f in *row {
                for c in 0..classes {
                    data.push(if c == f { hot.ln() } else { cold.ln() });
                }
            }
        }
        Tensor::from_data(TensorData::new(data, [frames.len(), time, classes]), device)
    }

    /// The full evaluation pipeline on a hand-built batch:
    /// predictions that decode to the truth must score accuracy
    /// 1.0 and a lower CTC loss than wrong / all-blank ones.
    #[test]
    fn test_pipeline_prefers_correct_predictions() {
        let device = NdArrayDevice::Cpu;
        let blank = 4usize;
        let decoder = GreedyDecoder::new(blank);
        let ctc = CtcLossConfig::new().with_blank(blank).init();

        // Truths [1,2] and [3,3]; the repeat needs a blank frame
        let targets =
            Tensor::<TestBackend, 2, Int>::from_data([[1, 2], [3, 3]], &device);
        let truths = target_rows(targets.clone());
        let input_lengths = Tensor::from_ints([4, 4], &device);
        let target_lengths = Tensor::from_ints([2, 2], &device);

        let good = frame_predictions(
            &[&[1, 2, blank, blank], &[3, blank, 3, blank]],
            5,
            0.9,
            &device,
        );
        let bad = frame_predictions(
            &[&[2, 1, blank, blank], &[blank, blank, blank, blank]],
            5,
            0.9,
            &device,
        );

        // Greedy decoding reproduces the truths exactly
        let decoded = decoder.decode_batch(good.clone());
        assert_eq!(decoded, vec![vec![1, 2], vec![3, 3]]);
        assert_eq!(batch_accuracy(&decoded, &truths), 1.0);

        // Wrong predictions match nothing
        let decoded_bad = decoder.decode_batch(bad.clone());
        assert_eq!(batch_accuracy(&decoded_bad, &truths), 0.0);

        // And the loss agrees with the metric
        let loss_good: f32 = ctc
            .forward_mean(
                good.swap_dims(0, 1),
                targets.clone(),
                input_lengths.clone(),
                target_lengths.clone(),
            )
            .into_scalar()
            .elem();
        let loss_bad: f32 = ctc
            .forward_mean(
                bad.swap_dims(0, 1),
                targets,
                input_lengths,
                target_lengths,
            )
            .into_scalar()
            .elem();
        assert!(loss_good < loss_bad);
    }
}
