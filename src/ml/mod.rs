// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the model, the loss, and the loops that
// drive Burn. The data layer only builds tensor batches; the
// domain layer describes architectures without tensors.
//
// What's in this layer:
//
//   model.rs     — Builds a network from an Architecture:
//                  • Conv2d / Linear parameters in layer order
//                  • ReLU, max-pooling, flatten, softmax
//                  • Dropout gated by an explicit Mode
//                  • Categorical cross-entropy on logits
//
//   trainer.rs   — The training loop
//                  Handles forward pass, loss computation,
//                  backward pass, optimiser step (Adam or
//                  SGD), and per-epoch validation
//
//   evaluator.rs — Loss/accuracy of a model on a partition
//                  in inference mode, plus predictions and
//                  a confusion matrix
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            LeCun et al. (1998) Gradient-Based Learning Applied
//            to Document Recognition

/// Layer stack, Mode, and loss
pub mod model;

/// Mini-batch training loop with optional validation
pub mod trainer;

/// Deterministic evaluation and prediction
pub mod evaluator;
