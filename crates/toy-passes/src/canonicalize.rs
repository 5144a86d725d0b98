//! Canonicalization pass.
//!
//! Drives a frozen pattern table to a fixed point with
//! [`PatternApplicator`], then garbage-collects operations left without
//! uses by the rewrites.

use tracing::{debug, info};

use toy_ir::context::IrContext;
use toy_ir::rewrite::{ApplyResult, FrozenPatternSet, PatternApplicator};
use toy_ir::transforms::{DceResult, eliminate_dead_code};

/// Configuration for [`canonicalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalizeConfig {
    /// Maximum rewrite passes before giving up. Default: 10.
    pub max_iterations: usize,
    /// Run dead code elimination after the rewrites. Default: true.
    pub remove_dead_code: bool,
}

impl Default for CanonicalizeConfig {
    fn default() -> Self {
        Self {
            max_iterations: PatternApplicator::DEFAULT_MAX_ITERATIONS,
            remove_dead_code: true,
        }
    }
}

/// Result of a canonicalization run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanonicalizeResult {
    pub rewrite: ApplyResult,
    /// `None` when dead code elimination was disabled.
    pub dce: Option<DceResult>,
}

impl CanonicalizeResult {
    /// Whether the rewrite driver reached a fixed point.
    pub fn converged(&self) -> bool {
        self.rewrite.reached_fixpoint
    }

    /// Number of operations removed by dead code elimination.
    pub fn removed_ops(&self) -> usize {
        self.dce.map_or(0, |d| d.removed_count)
    }
}

/// Canonicalize `ctx` under `patterns`.
pub fn canonicalize(
    ctx: &mut IrContext,
    patterns: &FrozenPatternSet,
    config: &CanonicalizeConfig,
) -> CanonicalizeResult {
    debug!(
        graph = ctx.name(),
        ops = ctx.ops().len(),
        patterns = patterns.len(),
        "canonicalize: start"
    );

    let rewrite = PatternApplicator::new(patterns)
        .with_max_iterations(config.max_iterations)
        .apply(ctx);

    let dce = config
        .remove_dead_code
        .then(|| eliminate_dead_code(ctx));

    let result = CanonicalizeResult { rewrite, dce };
    info!(
        graph = ctx.name(),
        iterations = rewrite.iterations,
        rewrites = rewrite.total_changes,
        removed = result.removed_ops(),
        converged = result.converged(),
        "canonicalize: done"
    );
    result
}
