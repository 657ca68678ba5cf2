// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   checkpoint.rs     — Saving and loading model weights
//                       Uses Burn's CompactRecorder to serialise
//                       model parameters to disk, one snapshot
//                       per save-due epoch plus a final one.
//                       Also saves/loads TrainConfig as JSON so
//                       inference can rebuild the model.
//
//   alphabet_store.rs — Alphabet persistence
//                       Builds the character set from the
//                       training transcripts if none exists, or
//                       loads a previously saved one. Ensures
//                       the same class layout is used for
//                       training and inference.
//
//   metrics.rs        — Running metric accumulators and the
//                       epoch-level CSV log (loss and accuracy
//                       for both splits).
//
// Why is this a separate layer?
//   These concerns are used by multiple other layers but
//   don't belong to any one of them.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Alphabet building, saving, and loading
pub mod alphabet_store;

/// Running means and the training metrics CSV logger
pub mod metrics;
