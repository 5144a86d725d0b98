//! PatternApplicator: fixed-point rewrite driver.
//!
//! Each pass snapshots the body and visits every operation that is still
//! live, trying the patterns registered for its class in table order. The
//! first match is applied immediately. Passes repeat until one completes
//! without a rewrite or the iteration cap is reached.

use tracing::{debug, trace, warn};

use super::pattern_set::FrozenPatternSet;
use super::rewriter::{self, PatternRewriter};
use crate::context::IrContext;
use crate::refs::OpRef;

/// Result of applying rewrite patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplyResult {
    /// Number of passes performed.
    pub iterations: usize,
    /// Total number of pattern matches (rewrites applied).
    pub total_changes: usize,
    /// Whether the fixpoint was reached (no changes in the last pass).
    pub reached_fixpoint: bool,
}

/// Driver state within a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// Pass in progress, nothing rewritten yet.
    Scanning,
    /// At least one rewrite happened in this pass.
    Changed,
    /// A full pass completed without rewrites.
    Converged,
}

/// Applies a frozen pattern table to a graph until fixpoint.
///
/// The table is borrowed, so one table can serve any number of drivers.
pub struct PatternApplicator<'p> {
    patterns: &'p FrozenPatternSet,
    max_iterations: usize,
}

impl<'p> PatternApplicator<'p> {
    pub const DEFAULT_MAX_ITERATIONS: usize = 10;

    pub fn new(patterns: &'p FrozenPatternSet) -> Self {
        Self {
            patterns,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set maximum fixpoint iterations.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Apply patterns until no pattern matches or the cap is reached.
    pub fn apply(&self, ctx: &mut IrContext) -> ApplyResult {
        let mut total_changes = 0;
        let mut iterations = 0;

        for _ in 0..self.max_iterations {
            iterations += 1;
            let (state, changes) = self.run_one_iteration(ctx);
            total_changes += changes;
            debug!(iteration = iterations, changes, ?state, "rewrite pass finished");
            if state == DriverState::Converged {
                return ApplyResult {
                    iterations,
                    total_changes,
                    reached_fixpoint: true,
                };
            }
        }

        warn!(
            max_iterations = self.max_iterations,
            total_changes, "pattern rewriting did not converge"
        );
        ApplyResult {
            iterations,
            total_changes,
            reached_fixpoint: false,
        }
    }

    /// Run a single pass over all operations.
    fn run_one_iteration(&self, ctx: &mut IrContext) -> (DriverState, usize) {
        let mut state = DriverState::Scanning;
        let mut changes = 0;

        // Ops inserted during this pass are picked up by the next one.
        let ops: Vec<OpRef> = ctx.ops().to_vec();

        for op in ops {
            // Skip ops erased earlier in this pass
            if !ctx.is_live(op) {
                continue;
            }
            if self.rewrite_op(ctx, op) {
                state = DriverState::Changed;
                changes += 1;
            }
        }

        if state == DriverState::Scanning {
            state = DriverState::Converged;
        }
        (state, changes)
    }

    /// Try the patterns for `op` in order; apply the first match.
    fn rewrite_op(&self, ctx: &mut IrContext, op: OpRef) -> bool {
        let class = ctx.op_kind(op).class();
        for pattern in self.patterns.patterns_for(class) {
            let mut rw = PatternRewriter::new();
            if !pattern.match_and_rewrite(ctx, op, &mut rw) {
                continue;
            }
            let Some(replacement) = rw.take_replacement() else {
                // Operations the pattern created are detached and still hold
                // uses of their operands, so the graph is no longer trusted.
                if cfg!(debug_assertions) {
                    panic!(
                        "pattern `{}` matched {op} without recording a replacement",
                        pattern.name()
                    );
                }
                warn!(pattern = pattern.name(), %op, "pattern matched without recording a replacement");
                continue;
            };
            trace!(pattern = pattern.name(), %op, "pattern applied");
            rewriter::apply_replacement(ctx, op, replacement);

            // The root has no uses left unless it was replaced by itself.
            if ctx.is_dead(op) {
                ctx.erase_op(op);
            }
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OpClass;
    use crate::ops;
    use crate::rewrite::{PatternBenefit, PatternSet, RewritePattern};
    use crate::types::{ElementKind, TypeData};

    /// Pattern: rename `toy.<from>` to `toy.<to>`.
    struct RenamePattern {
        from: &'static str,
        to: &'static str,
    }

    impl RewritePattern for RenamePattern {
        fn root(&self) -> OpClass {
            OpClass::Other
        }

        fn match_and_rewrite(
            &self,
            ctx: &mut IrContext,
            op: OpRef,
            rewriter: &mut PatternRewriter,
        ) -> bool {
            if ctx.op_name(op) != self.from {
                return false;
            }
            let operands = ctx.op_operands(op).to_vec();
            let ty = ctx.op_result_type(op);
            let new_op = ops::other(ctx, self.to, operands, ty);
            rewriter.replace_op(new_op);
            true
        }
    }

    /// Pattern that fires on every `toy.spin`, never converging.
    struct SpinPattern;

    impl RewritePattern for SpinPattern {
        fn root(&self) -> OpClass {
            OpClass::Other
        }

        fn match_and_rewrite(
            &self,
            ctx: &mut IrContext,
            op: OpRef,
            rewriter: &mut PatternRewriter,
        ) -> bool {
            if ctx.op_name(op) != "spin" {
                return false;
            }
            let ty = ctx.op_result_type(op);
            let new_op = ops::other(ctx, "spin", [], ty);
            rewriter.replace_op(new_op);
            true
        }
    }

    /// Claims every `toy.claim` but never records a replacement.
    struct ClaimPattern;

    impl RewritePattern for ClaimPattern {
        fn root(&self) -> OpClass {
            OpClass::Other
        }

        fn match_and_rewrite(
            &self,
            ctx: &mut IrContext,
            op: OpRef,
            _rewriter: &mut PatternRewriter,
        ) -> bool {
            ctx.op_name(op) == "claim"
        }
    }

    fn graph_with(name: &str) -> (IrContext, OpRef) {
        let mut ctx = IrContext::new();
        let ty = ctx.types.intern(TypeData::ranked([2], ElementKind::F64));
        let op = ops::other(&mut ctx, name, [], ty);
        ctx.push_op(op);
        ctx.set_outputs([ctx.op_result(op)]);
        (ctx, op)
    }

    #[test]
    fn applicator_renames_op() {
        let (mut ctx, _) = graph_with("source");
        let mut set = PatternSet::new();
        set.add(RenamePattern {
            from: "source",
            to: "target",
        });
        let patterns = set.freeze();

        let result = PatternApplicator::new(&patterns).apply(&mut ctx);
        assert_eq!(
            result,
            ApplyResult {
                iterations: 2,
                total_changes: 1,
                reached_fixpoint: true,
            }
        );

        let ops = ctx.ops();
        assert_eq!(ops.len(), 1);
        assert_eq!(ctx.op_name(ops[0]), "target");
        assert_eq!(ctx.outputs(), &[ctx.op_result(ops[0])]);
    }

    #[test]
    fn applicator_preserves_uses_via_rauw() {
        let (mut ctx, source) = graph_with("source");
        let ty = ctx.op_result_type(source);
        let source_result = ctx.op_result(source);
        let user = ops::other(&mut ctx, "use", [source_result], ty);
        ctx.push_op(user);

        let mut set = PatternSet::new();
        set.add(RenamePattern {
            from: "source",
            to: "target",
        });
        let patterns = set.freeze();
        PatternApplicator::new(&patterns).apply(&mut ctx);

        let ops = ctx.ops();
        assert_eq!(ops.len(), 2);
        assert_eq!(ctx.op_operands(ops[1]), &[ctx.op_result(ops[0])]);
        assert!(!ctx.is_live(source));
    }

    #[test]
    fn higher_benefit_wins() {
        let (mut ctx, _) = graph_with("source");
        let mut set = PatternSet::new();
        set.add(RenamePattern {
            from: "source",
            to: "low",
        })
        .add_with_benefit(
            RenamePattern {
                from: "source",
                to: "high",
            },
            PatternBenefit(2),
        );
        let patterns = set.freeze();
        PatternApplicator::new(&patterns).apply(&mut ctx);

        assert_eq!(ctx.op_name(ctx.ops()[0]), "high");
    }

    #[test]
    fn equal_benefit_uses_registration_order() {
        let (mut ctx, _) = graph_with("source");
        let mut set = PatternSet::new();
        set.add(RenamePattern {
            from: "source",
            to: "first",
        })
        .add(RenamePattern {
            from: "source",
            to: "second",
        });
        let patterns = set.freeze();
        PatternApplicator::new(&patterns).apply(&mut ctx);

        assert_eq!(ctx.op_name(ctx.ops()[0]), "first");
    }

    #[test]
    fn no_match_leaves_graph_untouched() {
        let (mut ctx, op) = graph_with("other");
        let mut set = PatternSet::new();
        set.add(RenamePattern {
            from: "source",
            to: "target",
        });
        let patterns = set.freeze();

        let result = PatternApplicator::new(&patterns).apply(&mut ctx);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.total_changes, 0);
        assert!(result.reached_fixpoint);
        assert_eq!(ctx.ops(), &[op]);
    }

    #[test]
    fn iteration_cap_stops_non_converging_patterns() {
        let (mut ctx, _) = graph_with("spin");
        let mut set = PatternSet::new();
        set.add(SpinPattern);
        let patterns = set.freeze();

        let result = PatternApplicator::new(&patterns)
            .with_max_iterations(3)
            .apply(&mut ctx);
        assert_eq!(
            result,
            ApplyResult {
                iterations: 3,
                total_changes: 3,
                reached_fixpoint: false,
            }
        );
        assert_eq!(ctx.ops().len(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "without recording a replacement")]
    fn match_without_replacement_is_a_contract_violation() {
        let (mut ctx, _) = graph_with("claim");
        let mut set = PatternSet::new();
        set.add(ClaimPattern);
        let patterns = set.freeze();

        PatternApplicator::new(&patterns).apply(&mut ctx);
    }
}
