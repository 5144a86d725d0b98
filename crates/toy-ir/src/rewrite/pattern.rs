//! Rewrite pattern trait.

use super::rewriter::PatternRewriter;
use crate::context::{IrContext, OpClass};
use crate::refs::OpRef;

/// Static priority of a pattern. Higher benefit patterns are tried first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternBenefit(pub u16);

impl Default for PatternBenefit {
    fn default() -> Self {
        PatternBenefit(1)
    }
}

/// A pattern that can match and transform an operation of one class.
///
/// # Arguments
///
/// - `ctx`: Mutable reference to the graph for querying and for creating
///   replacement operations.
/// - `op`: The operation to match against. Its class is always `root()`.
/// - `rewriter`: Records the replacement for `op`.
///
/// # Return Value
///
/// Return `true` if the pattern matched and recorded a replacement via the
/// rewriter. Return `false` if the pattern does not apply; in that case the
/// graph must be left untouched, so new operations may only be created once
/// the match has succeeded. Returning `true` without a replacement panics in
/// debug builds and is logged and skipped otherwise.
pub trait RewritePattern: Send + Sync {
    /// The operation class this pattern is rooted at.
    fn root(&self) -> OpClass;

    /// Attempt to match and rewrite an operation.
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool;

    /// Optional: return a human-readable name for debugging.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
