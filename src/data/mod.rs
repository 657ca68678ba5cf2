// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from an annotation file on disk
// all the way to GPU-ready tensor batches.
//
// The pipeline flows in this order:
//
//   annotation file (image<TAB>transcript)
//       │
//       ▼
//   AnnotationLoader  → parses lines, loads + admits samples
//       │
//       ▼
//   Preprocessor      → grayscale, fixed H×W, normalize [-1, 1]
//       │
//       ▼
//   Alphabet          → transcript → class-index label sequence
//       │
//       ▼
//   split_train_val   → shuffled train/validation split
//       │
//       ▼
//   LineDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   LineBatcher       → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Parses the annotation file and loads line images
pub mod loader;

/// Resizes and normalizes line images to the model's input shape
pub mod preprocessor;

/// Implements Burn's Dataset trait for text-line samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits samples into train/validation sets
pub mod splitter;
