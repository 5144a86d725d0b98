//! Toy dialect combine patterns.
//!
//! - `toy.transpose(toy.transpose(x))` -> `x`
//! - `toy.reshape<T2>(toy.reshape<T1>(x))` -> `toy.reshape<T2>(x)`
//!
//! Both patterns only look one producer up the chain. Longer chains are
//! collapsed by the fixed-point driver, one link per match.

use toy_ir::context::{IrContext, OpClass};
use toy_ir::ops::{self, ReshapeOp, TransposeOp};
use toy_ir::refs::OpRef;
use toy_ir::rewrite::{FrozenPatternSet, PatternRewriter, PatternSet, RewritePattern};

/// Pattern for `transpose(transpose(x))` -> `x`
///
/// Transpose is an involution, so the outer result is replaced by the inner
/// operand directly. No operation is created; the inner transpose is left
/// for dead code elimination once nothing else reads it.
pub struct SimplifyRedundantTranspose;

impl RewritePattern for SimplifyRedundantTranspose {
    fn root(&self) -> OpClass {
        OpClass::Transpose
    }

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool {
        let Some(outer) = TransposeOp::from_op(ctx, op) else {
            return false;
        };
        let Some(inner) = TransposeOp::from_value(ctx, outer.input(ctx)) else {
            return false;
        };

        rewriter.replace_op_with_value(inner.input(ctx));
        true
    }
}

/// Pattern for `reshape<T2>(reshape<T1>(x))` -> `reshape<T2>(x)`
///
/// The replacement keeps the outer declared type, so a fresh reshape of the
/// innermost source is built rather than reusing an existing value.
pub struct ReshapeReshapeOptPattern;

impl RewritePattern for ReshapeReshapeOptPattern {
    fn root(&self) -> OpClass {
        OpClass::Reshape
    }

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool {
        let Some(outer) = ReshapeOp::from_op(ctx, op) else {
            return false;
        };
        let Some(inner) = ReshapeOp::from_value(ctx, outer.input(ctx)) else {
            return false;
        };

        let source = inner.input(ctx);
        let result_ty = outer.result_type(ctx);
        let new_op = ops::reshape(ctx, source, result_ty);
        rewriter.replace_op(new_op.op_ref());
        true
    }
}

/// Register the canonicalization patterns rooted at `toy.transpose`.
pub fn transpose_canonicalization_patterns(set: &mut PatternSet) {
    set.add(SimplifyRedundantTranspose);
}

/// Register the canonicalization patterns rooted at `toy.reshape`.
pub fn reshape_canonicalization_patterns(set: &mut PatternSet) {
    set.add(ReshapeReshapeOptPattern);
}

/// Build the frozen table of every Toy canonicalization pattern.
///
/// Build it once and share it; the table is immutable and can be used by
/// any number of drivers.
pub fn toy_canonicalization_patterns() -> FrozenPatternSet {
    let mut set = PatternSet::new();
    transpose_canonicalization_patterns(&mut set);
    reshape_canonicalization_patterns(&mut set);
    set.freeze()
}
