// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to run one
// experiment step (train, evaluate, or compare).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file parsing (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Evaluate a saved artifact on the test partition
pub mod evaluate_use_case;

// Train both model kinds and compare them
pub mod compare_use_case;

// ─── Backend selection ────────────────────────────────────────────────────────
// CPU (NdArray) by default; `--features wgpu` trains on the GPU.
// Training wraps the backend in Autodiff; evaluation uses it bare.
#[cfg(not(feature = "wgpu"))]
pub type EvalBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type EvalBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<EvalBackend>;
