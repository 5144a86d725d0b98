//! Structural verification for the Toy op graph.
//!
//! Checks that:
//!
//! 1. Transpose and reshape carry exactly one operand.
//! 2. Every operand is a graph input or the result of a live operation
//!    placed earlier in the body (no dangling operands, no cycles).
//! 3. Every output is defined.
//! 4. The use-chains stored in `IrContext` exactly match the operand and
//!    output slots of the graph.
//!
//! Rewrites are expected to preserve all four; the driver does not check
//! them itself, so tests and the CLI call [`verify`] around it.

use std::collections::{HashMap, HashSet};

use derive_more::{Display, Error};

use crate::context::{IrContext, Use, User};
use crate::refs::{OpRef, ValueRef};

/// A single verification failure.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[display("{op} (toy.{name}) expects {expected} operand(s), found {found}")]
    Arity {
        op: OpRef,
        name: String,
        expected: usize,
        found: usize,
    },
    #[display("operand #{index} of {op} references {value}, which is not defined before it")]
    UndefinedOperand {
        op: OpRef,
        index: usize,
        value: ValueRef,
    },
    #[display("output #{index} references {value}, which is not defined")]
    UndefinedOutput { index: usize, value: ValueRef },
    #[display("use-chain mismatch: {message}")]
    UseChain { message: String },
}

/// Verify the graph, collecting every failure.
pub fn verify(ctx: &IrContext) -> Result<(), Vec<VerifyError>> {
    let mut errors = Vec::new();
    let mut defined: HashSet<ValueRef> = ctx.inputs().iter().copied().collect();
    let mut expected_uses: HashMap<ValueRef, HashSet<Use>> = HashMap::new();

    for &op in ctx.ops() {
        let operands = ctx.op_operands(op);
        if let Some(expected) = ctx.op_kind(op).fixed_arity()
            && operands.len() != expected
        {
            errors.push(VerifyError::Arity {
                op,
                name: ctx.op_name(op).to_owned(),
                expected,
                found: operands.len(),
            });
        }

        for (index, &value) in operands.iter().enumerate() {
            if !defined.contains(&value) {
                errors.push(VerifyError::UndefinedOperand { op, index, value });
            }
            expected_uses.entry(value).or_default().insert(Use {
                user: User::Op(op),
                index: index as u32,
            });
        }

        defined.insert(ctx.op_result(op));
    }

    for (index, &value) in ctx.outputs().iter().enumerate() {
        if !defined.contains(&value) {
            errors.push(VerifyError::UndefinedOutput { index, value });
        }
        expected_uses.entry(value).or_default().insert(Use {
            user: User::Output,
            index: index as u32,
        });
    }

    let mut values: Vec<ValueRef> = defined.into_iter().collect();
    values.sort();
    for value in values {
        check_use_chain(ctx, value, expected_uses.remove(&value), &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_use_chain(
    ctx: &IrContext,
    value: ValueRef,
    expected: Option<HashSet<Use>>,
    errors: &mut Vec<VerifyError>,
) {
    let expected = expected.unwrap_or_default();
    let recorded = ctx.uses(value);
    let actual: HashSet<Use> = recorded.iter().copied().collect();

    if actual.len() != recorded.len() {
        errors.push(VerifyError::UseChain {
            message: format!("{value} has duplicate use entries"),
        });
    }
    for u in actual.difference(&expected) {
        errors.push(VerifyError::UseChain {
            message: format!("{value} records a stale use {}", describe_use(u)),
        });
    }
    for u in expected.difference(&actual) {
        errors.push(VerifyError::UseChain {
            message: format!("{value} is missing the use {}", describe_use(u)),
        });
    }
}

fn describe_use(u: &Use) -> String {
    match u.user {
        User::Op(op) => format!("by operand #{} of {op}", u.index),
        User::Output => format!("by output #{}", u.index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{OpKind, OperationDataBuilder};
    use crate::ops;
    use crate::types::{ElementKind, TypeData};

    fn setup() -> (IrContext, ValueRef) {
        let mut ctx = IrContext::new();
        let ty = ctx.types.intern(TypeData::ranked([2, 3], ElementKind::F64));
        let arg = ctx.add_input(ty);
        (ctx, arg)
    }

    #[test]
    fn well_formed_graph_passes() {
        let (mut ctx, arg) = setup();
        let t = ops::transpose(&mut ctx, arg, None);
        ctx.push_op(t.op_ref());
        ctx.set_outputs([t.result(&ctx)]);

        assert_eq!(verify(&ctx), Ok(()));
    }

    #[test]
    fn wrong_arity_is_reported() {
        let (mut ctx, arg) = setup();
        let ty = ctx.value_ty(arg);
        let data = OperationDataBuilder::new(OpKind::Transpose, ty)
            .operands([arg, arg])
            .build(&mut ctx);
        let op = ctx.create_op(data);
        ctx.push_op(op);

        let errors = verify(&ctx).unwrap_err();
        assert_eq!(
            errors,
            vec![VerifyError::Arity {
                op,
                name: "transpose".to_owned(),
                expected: 1,
                found: 2,
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            "op0 (toy.transpose) expects 1 operand(s), found 2"
        );
    }

    #[test]
    fn operand_defined_later_is_reported() {
        let (mut ctx, arg) = setup();
        let first = ops::transpose(&mut ctx, arg, None);
        let first_result = first.result(&ctx);
        let second = ops::transpose(&mut ctx, first_result, None);
        ctx.push_op(second.op_ref());
        ctx.push_op(first.op_ref());

        let errors = verify(&ctx).unwrap_err();
        assert!(matches!(
            errors.as_slice(),
            [VerifyError::UndefinedOperand { index: 0, .. }]
        ));
    }

    #[test]
    fn detached_output_and_stale_use_are_reported() {
        let (mut ctx, arg) = setup();
        // Created but never placed in the body.
        let detached = ops::transpose(&mut ctx, arg, None);
        ctx.set_outputs([detached.result(&ctx)]);

        let errors = verify(&ctx).unwrap_err();
        assert!(errors.contains(&VerifyError::UndefinedOutput {
            index: 0,
            value: detached.result(&ctx),
        }));
        assert!(errors.iter().any(|e| matches!(
            e,
            VerifyError::UseChain { message } if message.contains("stale use")
        )));
    }
}
