//! Rewrite infrastructure for the Toy op graph.
//!
//! Patterns are registered into a [`PatternSet`], frozen into an immutable
//! [`FrozenPatternSet`] keyed by operation class, and driven to a fixed
//! point by the [`PatternApplicator`]. Mutations go through the
//! [`PatternRewriter`] and are applied in place with RAUW.

pub mod applicator;
pub mod pattern;
pub mod pattern_set;
pub mod rewriter;

pub use applicator::{ApplyResult, DriverState, PatternApplicator};
pub use pattern::{PatternBenefit, RewritePattern};
pub use pattern_set::{FrozenPatternSet, PatternSet};
pub use rewriter::PatternRewriter;
