//! PatternRewriter: records the replacement chosen by a pattern.
//!
//! No value remapping is needed; RAUW on the context rewires every
//! consumer once the applicator applies the replacement.

use crate::context::IrContext;
use crate::refs::{OpRef, ValueRef};

/// Replacement for the root operation of a successful match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Replacement {
    /// A newly created, detached operation whose result takes over.
    Op(OpRef),
    /// An existing value that takes over.
    Value(ValueRef),
}

/// Rewriter interface for patterns.
///
/// Patterns use this to record how the matched operation is replaced. The
/// `PatternApplicator` applies the replacement after the pattern returns.
#[derive(Default)]
pub struct PatternRewriter {
    replacement: Option<Replacement>,
}

impl PatternRewriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replace the current operation with a new one.
    ///
    /// The op must already be created via `ctx.create_op()` but not yet
    /// attached. The applicator inserts it before the current op and
    /// rewires all uses of the current op's result to the new result.
    pub fn replace_op(&mut self, new_op: OpRef) {
        debug_assert!(
            self.replacement.is_none(),
            "replace_op called after a replacement was already recorded"
        );
        self.replacement = Some(Replacement::Op(new_op));
    }

    /// Replace the current operation's result with an existing value.
    pub fn replace_op_with_value(&mut self, value: ValueRef) {
        debug_assert!(
            self.replacement.is_none(),
            "replace_op_with_value called after a replacement was already recorded"
        );
        self.replacement = Some(Replacement::Value(value));
    }

    pub(crate) fn take_replacement(self) -> Option<Replacement> {
        self.replacement
    }
}

/// Apply a recorded replacement to the graph.
///
/// Inserts the replacement op (if any) in front of `original_op` and
/// rewires every use of the original result. The original op is left in
/// place; it has no uses afterwards and the caller decides when to erase it.
pub(crate) fn apply_replacement(
    ctx: &mut IrContext,
    original_op: OpRef,
    replacement: Replacement,
) {
    let old_result = ctx.op_result(original_op);
    let new_result = match replacement {
        Replacement::Op(new_op) => {
            ctx.insert_op_before(original_op, new_op);
            ctx.op_result(new_op)
        }
        Replacement::Value(value) => value,
    };
    ctx.replace_all_uses(old_result, new_result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;
    use crate::types::{ElementKind, TypeData};

    #[test]
    fn replace_with_value_rewires_uses() {
        let mut ctx = IrContext::new();
        let ty = ctx.types.intern(TypeData::ranked([4], ElementKind::F64));
        let arg = ctx.add_input(ty);
        let neg = ops::other(&mut ctx, "neg", [arg], ty);
        ctx.push_op(neg);
        let neg_result = ctx.op_result(neg);
        let user = ops::other(&mut ctx, "print", [neg_result], ty);
        ctx.push_op(user);

        apply_replacement(&mut ctx, neg, Replacement::Value(arg));

        assert_eq!(ctx.op_operands(user), &[arg]);
        assert!(ctx.is_dead(neg));
        assert!(ctx.is_live(neg));
    }

    #[test]
    fn replace_with_op_inserts_before_original() {
        let mut ctx = IrContext::new();
        let ty = ctx.types.intern(TypeData::ranked([4], ElementKind::F64));
        let arg = ctx.add_input(ty);
        let old = ops::other(&mut ctx, "neg", [arg], ty);
        ctx.push_op(old);
        ctx.set_outputs([ctx.op_result(old)]);

        let new = ops::other(&mut ctx, "abs", [arg], ty);
        let mut rw = PatternRewriter::new();
        rw.replace_op(new);
        let replacement = rw.take_replacement().expect("replacement recorded");
        apply_replacement(&mut ctx, old, replacement);

        assert_eq!(ctx.ops(), &[new, old]);
        assert_eq!(ctx.outputs(), &[ctx.op_result(new)]);
    }
}
