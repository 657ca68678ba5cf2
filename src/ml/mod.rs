// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly — except the data
// layer's Dataset/Batcher impls, which exist for this one.
//
// What's in this layer:
//
//   model.rs    — The CRNN architecture
//                 Conv feature extractor → bidirectional LSTM →
//                 per-timestep class log-probabilities
//
//   ctc_loss.rs — Connectionist Temporal Classification loss
//                 Log-space forward (alpha) recursion over the
//                 blank-interleaved label sequence, built from
//                 tensor ops so autodiff supplies the gradients
//
//   decoder.rs  — Greedy (best-path) CTC decoding
//
//   accuracy.rs — Sequence-exact-match accuracy
//
//   trainer.rs  — The training loop
//                 Forward pass, CTC loss, backward pass, Adam
//                 step, decoding + accuracy, running metrics,
//                 periodic and final checkpoint saving
//
//   inferencer.rs — Loads a checkpoint and transcribes images
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Graves et al. (2006) CTC
//            Shi et al. (2017) CRNN

/// CRNN sequence model architecture
pub mod model;

/// CTC loss (log-space alpha recursion)
pub mod ctc_loss;

/// Greedy best-path decoder
pub mod decoder;

/// Sequence-exact-match accuracy metric
pub mod accuracy;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads a checkpoint and recognizes text
pub mod inferencer;
