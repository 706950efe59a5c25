// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums, and traits that define the core
// concepts of the digit classification pipeline.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Think of this layer as the "dictionary" of the system —
// it defines what things ARE, not how they work.
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// Error taxonomy shared by every layer below the CLI
pub mod error;

// Raw image samples, labels, and dataset partitions
pub mod image;

// Layer descriptors, data shapes, and architecture validation
pub mod architecture;

// Per-epoch metrics and the training run record
pub mod training;

// Core abstractions (traits) that other layers implement
pub mod traits;
