//! Dead Code Elimination (DCE) for the Toy op graph.
//!
//! Removes operations whose result is never used. Graph outputs count as
//! uses, so externally observed results are always kept. Uses the
//! context's use-chains for O(1) dead-op detection.

use tracing::debug;

use crate::context::IrContext;
use crate::refs::OpRef;

/// Configuration for dead code elimination.
#[derive(Debug, Clone)]
pub struct DceConfig {
    /// Maximum fixpoint iterations before giving up. Default: 100.
    pub max_iterations: usize,
}

impl Default for DceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
        }
    }
}

/// Result of running dead code elimination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DceResult {
    /// Total number of operations removed.
    pub removed_count: usize,
    /// Number of fixpoint iterations performed.
    pub iterations: usize,
    /// Whether fixpoint was reached (no more changes possible).
    pub reached_fixpoint: bool,
}

/// Eliminate dead code using default configuration.
pub fn eliminate_dead_code(ctx: &mut IrContext) -> DceResult {
    eliminate_dead_code_with_config(ctx, DceConfig::default())
}

/// Eliminate dead code with custom configuration.
pub fn eliminate_dead_code_with_config(ctx: &mut IrContext, config: DceConfig) -> DceResult {
    let max_iterations = if config.max_iterations == 0 {
        100
    } else {
        config.max_iterations
    };

    let mut total_removed = 0;

    for iteration in 0..max_iterations {
        let removed = sweep(ctx);

        if removed == 0 {
            debug!(
                removed = total_removed,
                iterations = iteration + 1,
                "dead code elimination finished"
            );
            return DceResult {
                removed_count: total_removed,
                iterations: iteration + 1,
                reached_fixpoint: true,
            };
        }

        total_removed += removed;
    }

    DceResult {
        removed_count: total_removed,
        iterations: max_iterations,
        reached_fixpoint: false,
    }
}

/// Sweep the body in reverse order, removing dead ops.
///
/// Iterating in reverse maximizes cascade removal: if op C uses op B's
/// result and op B uses op A's result, removing C first frees B, then A.
fn sweep(ctx: &mut IrContext) -> usize {
    let mut removed = 0;
    let ops: Vec<OpRef> = ctx.ops().to_vec();
    for &op in ops.iter().rev() {
        if ctx.is_dead(op) {
            ctx.erase_op(op);
            removed += 1;
        }
    }
    removed
}
