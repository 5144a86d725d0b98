//! Text format printer for the Toy op graph.
//!
//! ```text
//! toy.graph @main(%arg0: tensor<2x3xf64>) {
//!   %0 = toy.transpose %arg0 : tensor<3x2xf64>
//!   %1 = toy.reshape %0 : tensor<6xf64>
//!   toy.return %1
//! }
//! ```
//!
//! Values are renumbered in body order, so printing is stable across
//! rewrites that leave the same shape of graph behind.

use std::collections::HashMap;
use std::fmt::{self, Write};

use super::context::IrContext;
use super::refs::{OpRef, TypeRef, ValueRef};

/// Print state for value numbering.
struct PrintState<'a> {
    ctx: &'a IrContext,
    value_names: HashMap<ValueRef, String>,
    next_value_num: usize,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        let value_names = ctx
            .inputs()
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, format!("%arg{i}")))
            .collect();
        Self {
            ctx,
            value_names,
            next_value_num: 0,
        }
    }

    fn assign_value_name(&mut self, v: ValueRef) -> String {
        let name = format!("%{}", self.next_value_num);
        self.next_value_num += 1;
        self.value_names.insert(v, name.clone());
        name
    }

    fn get_value_name(&self, v: ValueRef) -> &str {
        self.value_names.get(&v).map(|s| s.as_str()).unwrap_or("%?")
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Print the whole graph as IR text.
pub fn print_graph(ctx: &IrContext) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    write_graph(&mut state, &mut out).expect("fmt::Write to String never fails");
    out
}

/// Print a type as IR text.
pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    ctx.types.get(ty).to_string()
}

// ============================================================================
// Graph printing
// ============================================================================

fn write_graph(state: &mut PrintState<'_>, f: &mut impl Write) -> fmt::Result {
    let ctx = state.ctx;
    write!(f, "toy.graph @{}(", ctx.name())?;
    for (i, &arg) in ctx.inputs().iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(
            f,
            "{}: {}",
            state.get_value_name(arg),
            ctx.types.get(ctx.value_ty(arg))
        )?;
    }
    f.write_str(") {\n")?;

    for &op in ctx.ops() {
        write_operation(state, f, op, 2)?;
    }

    f.write_str("  toy.return")?;
    for (i, &v) in ctx.outputs().iter().enumerate() {
        f.write_str(if i == 0 { " " } else { ", " })?;
        f.write_str(state.get_value_name(v))?;
    }
    f.write_str("\n}\n")
}

fn write_operation(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    write!(f, "{:indent$}", "")?;

    // Operands are named before the result, so a self-reference prints as %?
    let operands: Vec<String> = ctx
        .op_operands(op)
        .iter()
        .map(|&v| state.get_value_name(v).to_owned())
        .collect();

    let name = state.assign_value_name(ctx.op_result(op));
    write!(f, "{name} = toy.{}", ctx.op_name(op))?;

    if !operands.is_empty() {
        write!(f, " {}", operands.join(", "))?;
    }

    writeln!(f, " : {}", ctx.types.get(ctx.op_result_type(op)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;
    use crate::types::{ElementKind, TypeData};
    use insta::assert_snapshot;

    #[test]
    fn print_transpose_chain() {
        let mut ctx = IrContext::new();
        let ty = ctx.types.intern(TypeData::ranked([2, 3], ElementKind::F64));
        let arg = ctx.add_input(ty);

        let t0 = ops::transpose(&mut ctx, arg, None);
        ctx.push_op(t0.op_ref());
        let t0_result = t0.result(&ctx);
        let t1 = ops::transpose(&mut ctx, t0_result, None);
        ctx.push_op(t1.op_ref());
        ctx.set_outputs([t1.result(&ctx)]);

        assert_snapshot!(print_graph(&ctx), @r"
        toy.graph @main(%arg0: tensor<2x3xf64>) {
          %0 = toy.transpose %arg0 : tensor<3x2xf64>
          %1 = toy.transpose %0 : tensor<2x3xf64>
          toy.return %1
        }
        ");
    }

    #[test]
    fn print_other_ops_and_empty_return() {
        let mut ctx = IrContext::with_name("consts");
        let ty = ctx.types.intern(TypeData::unranked(ElementKind::F64));
        let c = ops::other(&mut ctx, "constant", [], ty);
        ctx.push_op(c);
        let c_result = ctx.op_result(c);
        let m = ops::other(&mut ctx, "mul", [c_result, c_result], ty);
        ctx.push_op(m);

        assert_snapshot!(print_graph(&ctx), @r"
        toy.graph @consts() {
          %0 = toy.constant : tensor<*xf64>
          %1 = toy.mul %0, %0 : tensor<*xf64>
          toy.return
        }
        ");
    }

    #[test]
    fn print_type_formats_rank_zero() {
        let mut ctx = IrContext::new();
        let ty = ctx.types.intern(TypeData::ranked([], ElementKind::I64));
        assert_eq!(print_type(&ctx, ty), "tensor<i64>");
    }
}
