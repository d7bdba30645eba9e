// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits describing what the trainer
// works with: labelled sequences, batches of them, and the
// source that produces batches.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Examples and fixed-shape batches
pub mod batch;

// The data-provisioning abstraction
pub mod traits;
