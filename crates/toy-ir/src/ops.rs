//! Typed views and builders for Toy dialect operations.
//!
//! `TransposeOp` and `ReshapeOp` wrap an `OpRef` whose kind has been checked,
//! so patterns can ask "is this value produced by a transpose?" without
//! repeating the kind test.

use super::context::{IrContext, OpKind, OperationDataBuilder};
use super::refs::{OpRef, TypeRef, ValueRef};

/// A `toy.transpose` operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransposeOp(OpRef);

/// A `toy.reshape` operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReshapeOp(OpRef);

macro_rules! unary_op_view {
    ($ty:ident, $kind:ident) => {
        impl $ty {
            /// View `op` as this operation kind, if it is one.
            pub fn from_op(ctx: &IrContext, op: OpRef) -> Option<Self> {
                (ctx.op_kind(op) == OpKind::$kind).then_some($ty(op))
            }

            /// View the producer of `value` as this operation kind, if it is one.
            pub fn from_value(ctx: &IrContext, value: ValueRef) -> Option<Self> {
                ctx.defining_op(value)
                    .and_then(|op| Self::from_op(ctx, op))
            }

            pub fn op_ref(self) -> OpRef {
                self.0
            }

            /// The single operand.
            pub fn input(self, ctx: &IrContext) -> ValueRef {
                ctx.op_operands(self.0)[0]
            }

            pub fn result(self, ctx: &IrContext) -> ValueRef {
                ctx.op_result(self.0)
            }

            pub fn result_type(self, ctx: &IrContext) -> TypeRef {
                ctx.op_result_type(self.0)
            }
        }
    };
}

unary_op_view!(TransposeOp, Transpose);
unary_op_view!(ReshapeOp, Reshape);

/// Create a detached `toy.transpose` of `input`.
///
/// Without an explicit `result_ty` the result type is the input type with
/// its dimensions reversed.
pub fn transpose(ctx: &mut IrContext, input: ValueRef, result_ty: Option<TypeRef>) -> TransposeOp {
    let ty = match result_ty {
        Some(ty) => ty,
        None => {
            let transposed = ctx.types.get(ctx.value_ty(input)).transposed();
            ctx.types.intern(transposed)
        }
    };
    let data = OperationDataBuilder::new(OpKind::Transpose, ty)
        .operand(input)
        .build(ctx);
    TransposeOp(ctx.create_op(data))
}

/// Create a detached `toy.reshape` of `input` to `result_ty`.
pub fn reshape(ctx: &mut IrContext, input: ValueRef, result_ty: TypeRef) -> ReshapeOp {
    let data = OperationDataBuilder::new(OpKind::Reshape, result_ty)
        .operand(input)
        .build(ctx);
    ReshapeOp(ctx.create_op(data))
}

/// Create a detached operation of any other kind.
pub fn other(
    ctx: &mut IrContext,
    name: &str,
    operands: impl IntoIterator<Item = ValueRef>,
    result_ty: TypeRef,
) -> OpRef {
    let name = ctx.names.intern(name);
    let data = OperationDataBuilder::new(OpKind::Other(name), result_ty)
        .operands(operands)
        .build(ctx);
    ctx.create_op(data)
}
