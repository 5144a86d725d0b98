//! Integration tests for the toy-ir public API.
//!
//! These tests go through the text format so that graphs read the way they
//! would in a `.toy` file, then drive the rewrite infrastructure with a small
//! pattern defined here.

use insta::assert_snapshot;
use toy_ir::rewrite::{PatternApplicator, PatternRewriter, PatternSet, RewritePattern};
use toy_ir::transforms::eliminate_dead_code;
use toy_ir::{IrContext, OpClass, OpRef, parse_graph, print_graph, verify};

/// Folds `toy.neg(toy.neg(x))` into `x`.
struct DoubleNeg;

impl RewritePattern for DoubleNeg {
    fn root(&self) -> OpClass {
        OpClass::Other
    }

    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter,
    ) -> bool {
        if ctx.op_name(op) != "neg" {
            return false;
        }
        let Some(inner) = ctx.defining_op(ctx.op_operands(op)[0]) else {
            return false;
        };
        if ctx.op_name(inner) != "neg" {
            return false;
        }
        rewriter.replace_op_with_value(ctx.op_operands(inner)[0]);
        true
    }
}

fn parse(input: &str) -> IrContext {
    let ctx = parse_graph(input).unwrap_or_else(|e| panic!("{e}"));
    verify(&ctx).unwrap_or_else(|errors| panic!("{errors:?}"));
    ctx
}

#[test]
fn printed_graph_is_canonical() {
    let ctx = parse(
        "toy.graph @main(%x: tensor<2x3xf64>) {
           %a = toy.transpose %x
           %b = toy.reshape %a : tensor<6xf64>
           %c = toy.print %b
           toy.return %b, %c
         }",
    );

    assert_snapshot!(print_graph(&ctx), @r"
    toy.graph @main(%arg0: tensor<2x3xf64>) {
      %0 = toy.transpose %arg0 : tensor<3x2xf64>
      %1 = toy.reshape %0 : tensor<6xf64>
      %2 = toy.print %1 : tensor<*xf64>
      toy.return %1, %2
    }
    ");
}

#[test]
fn driver_rewires_outputs_and_dce_collects_leftovers() {
    let mut ctx = parse(
        "toy.graph @main(%x: tensor<4xf64>) {
           %a = toy.neg %x : tensor<4xf64>
           %b = toy.neg %a : tensor<4xf64>
           toy.return %b
         }",
    );

    let mut set = PatternSet::new();
    set.add(DoubleNeg);
    let patterns = set.freeze();
    let result = PatternApplicator::new(&patterns).apply(&mut ctx);
    assert!(result.reached_fixpoint);
    assert_eq!(result.total_changes, 1);
    assert_eq!(verify(&ctx), Ok(()));

    // The outer neg is gone; the inner one is dead but still present.
    assert_eq!(ctx.ops().len(), 1);
    assert_eq!(ctx.outputs(), ctx.inputs());

    let dce = eliminate_dead_code(&mut ctx);
    assert_eq!(dce.removed_count, 1);
    assert_eq!(verify(&ctx), Ok(()));

    assert_snapshot!(print_graph(&ctx), @r"
    toy.graph @main(%arg0: tensor<4xf64>) {
      toy.return %arg0
    }
    ");
}

#[test]
fn shared_table_serves_independent_graphs() {
    let mut set = PatternSet::new();
    set.add(DoubleNeg);
    let patterns = set.freeze();

    let source = "toy.graph @main(%x: tensor<f64>) {
                    %a = toy.neg %x : tensor<f64>
                    %b = toy.neg %a : tensor<f64>
                    toy.return %b
                  }";

    let patterns = &patterns;
    let printed: Vec<String> = std::thread::scope(|s| {
        let mut handles = Vec::new();
        for _ in 0..4 {
            handles.push(s.spawn(move || {
                let mut ctx = parse(source);
                PatternApplicator::new(patterns).apply(&mut ctx);
                eliminate_dead_code(&mut ctx);
                print_graph(&ctx)
            }));
        }
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(printed.windows(2).all(|w| w[0] == w[1]));
    assert!(!printed[0].contains("toy.neg"));
}
