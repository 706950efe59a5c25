// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles everything that touches disk after training:
//
//   persistence.rs — Model artifacts
//                    One gzip-compressed file per model with
//                    a format version, the architecture as
//                    JSON, and every parameter. Also saves and
//                    loads TrainConfig as JSON next to it.
//
//   metrics.rs     — Training metrics logging
//                    Appends epoch-level metrics (loss,
//                    accuracy) to a CSV file for later
//                    analysis and plotting.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model artifact saving and loading
pub mod persistence;

/// Training metrics CSV logger
pub mod metrics;
