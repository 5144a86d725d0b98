//! Passes for the Toy dialect.
//!
//! Holds the Toy combine patterns and the canonicalization pass that drives
//! them to a fixed point.

pub mod canonicalize;
pub mod combine;

// Re-exports
pub use canonicalize::{CanonicalizeConfig, CanonicalizeResult, canonicalize};
pub use combine::{
    ReshapeReshapeOptPattern, SimplifyRedundantTranspose, reshape_canonicalization_patterns,
    toy_canonicalization_patterns, transpose_canonicalization_patterns,
};
