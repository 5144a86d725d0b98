//! Toy IR text format parser.
//!
//! Parses the textual format produced by [`crate::printer`] into an
//! [`IrContext`].
//!
//! # Two-stage parsing
//!
//! 1. **Raw parse**: winnow combinators parse text into `Raw*` structures.
//! 2. **Graph build**: `GraphBuilder` resolves value names, types, and op
//!    kinds, and creates the operations.
//!
//! Statements are line-oriented: operands and the result type must be on
//! the same line as the operation name. `//` starts a comment.

use std::collections::HashMap;

use derive_more::{Display, Error};
use winnow::ascii;
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated, terminated};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

use crate::context::IrContext;
use crate::ops;
use crate::refs::{TypeRef, ValueRef};
use crate::types::{ElementKind, TypeData};

// ============================================================================
// Error type
// ============================================================================

/// Parse error for the Toy IR text format.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }

    /// 1-based line and column of the error within `input`.
    pub fn line_col(&self, input: &str) -> (usize, usize) {
        let prefix = &input[..self.offset.min(input.len())];
        let line = prefix.matches('\n').count() + 1;
        let col = prefix.rfind('\n').map_or(prefix.len(), |nl| prefix.len() - nl - 1) + 1;
        (line, col)
    }
}

// ============================================================================
// Raw (unresolved) structures
// ============================================================================

#[derive(Debug, Clone)]
struct RawType<'a> {
    /// `None` for unranked tensors.
    dims: Option<Vec<u64>>,
    element: &'a str,
}

#[derive(Debug, Clone)]
struct RawArg<'a> {
    /// Length of the input remaining at the argument's `%name`.
    rest_len: usize,
    name: &'a str,
    ty: RawType<'a>,
}

#[derive(Debug, Clone)]
struct RawHeader<'a> {
    name: &'a str,
    args: Vec<RawArg<'a>>,
}

#[derive(Debug, Clone)]
enum RawStatement<'a> {
    Op {
        result: &'a str,
        op_name: &'a str,
        operands: Vec<&'a str>,
        ty: Option<RawType<'a>>,
    },
    Return {
        operands: Vec<&'a str>,
    },
}

// ============================================================================
// Winnow parsers
// ============================================================================

/// Skip whitespace, newlines, and `//` comments.
fn ws(input: &mut &str) -> ModalResult<()> {
    loop {
        take_while(0.., |c: char| c.is_ascii_whitespace())
            .void()
            .parse_next(input)?;
        if input.starts_with("//") {
            take_till(0.., '\n').void().parse_next(input)?;
        } else {
            return Ok(());
        }
    }
}

/// Skip horizontal whitespace only.
fn hws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., [' ', '\t']).void().parse_next(input)
}

/// Parse an identifier: [a-zA-Z_][a-zA-Z0-9_]*
fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Parse a value reference: %name or %number
fn value_ref<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded(
        '%',
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
    .parse_next(input)
}

/// Parse a comma-separated list of value references on one line.
fn operand_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    separated(1.., value_ref, (hws, ',', hws)).parse_next(input)
}

/// Parse a tensor type: `tensor<2x3xf64>`, `tensor<f64>`, `tensor<*xf64>`.
fn raw_type<'a>(input: &mut &'a str) -> ModalResult<RawType<'a>> {
    "tensor<".parse_next(input)?;
    let dims = alt((
        "*x".value(None),
        repeat(0.., terminated(ascii::dec_uint::<_, u64, _>, 'x')).map(|dims: Vec<u64>| Some(dims)),
    ))
    .parse_next(input)?;
    let element = ident.parse_next(input)?;
    '>'.parse_next(input)?;
    Ok(RawType { dims, element })
}

/// Parse `%name: type` inside a graph header.
fn raw_arg<'a>(input: &mut &'a str) -> ModalResult<RawArg<'a>> {
    ws.parse_next(input)?;
    let rest_len = input.len();
    let name = value_ref.parse_next(input)?;
    (ws, ':', ws).parse_next(input)?;
    let ty = raw_type.parse_next(input)?;
    ws.parse_next(input)?;
    Ok(RawArg { rest_len, name, ty })
}

/// Parse `toy.graph @name(%arg0: type, ...) {`.
fn raw_header<'a>(input: &mut &'a str) -> ModalResult<RawHeader<'a>> {
    ws.parse_next(input)?;
    "toy.graph".parse_next(input)?;
    ws.parse_next(input)?;
    let name = preceded('@', ident).parse_next(input)?;
    ws.parse_next(input)?;
    let args = delimited(
        ('(', ws),
        separated(0.., raw_arg, ','),
        (ws, ')'),
    )
    .parse_next(input)?;
    ws.parse_next(input)?;
    '{'.parse_next(input)?;
    Ok(RawHeader { name, args })
}

/// Parse `toy.return [%a, %b, ...]`.
fn raw_return<'a>(input: &mut &'a str) -> ModalResult<RawStatement<'a>> {
    "toy.return".parse_next(input)?;
    let operands = opt(preceded(hws, operand_list))
        .parse_next(input)?
        .unwrap_or_default();
    Ok(RawStatement::Return { operands })
}

/// Parse `%name = toy.op [%a, %b, ...] [: type]`.
fn raw_op<'a>(input: &mut &'a str) -> ModalResult<RawStatement<'a>> {
    let result = value_ref.parse_next(input)?;
    (hws, '=', hws, "toy.").parse_next(input)?;
    let op_name = ident.parse_next(input)?;
    let operands = opt(preceded(hws, operand_list))
        .parse_next(input)?
        .unwrap_or_default();
    let ty = opt(preceded((hws, ':', hws), raw_type)).parse_next(input)?;
    Ok(RawStatement::Op {
        result,
        op_name,
        operands,
        ty,
    })
}

fn raw_statement<'a>(input: &mut &'a str) -> ModalResult<RawStatement<'a>> {
    alt((raw_return, raw_op)).parse_next(input)
}

// ============================================================================
// GraphBuilder (Raw -> IrContext)
// ============================================================================

struct GraphBuilder<'a> {
    ctx: IrContext,
    /// Maps value name (without %) -> ValueRef
    value_map: HashMap<&'a str, ValueRef>,
}

impl<'a> GraphBuilder<'a> {
    fn new(name: &str) -> Self {
        Self {
            ctx: IrContext::with_name(name),
            value_map: HashMap::new(),
        }
    }

    fn build_type(&mut self, raw: &RawType<'_>, offset: usize) -> Result<TypeRef, ParseError> {
        let element = ElementKind::from_name(raw.element).ok_or_else(|| {
            ParseError::new(format!("unknown element type '{}'", raw.element), offset)
        })?;
        let data = match &raw.dims {
            Some(dims) => TypeData::ranked(dims.iter().copied(), element),
            None => TypeData::unranked(element),
        };
        Ok(self.ctx.types.intern(data))
    }

    fn define(&mut self, name: &'a str, value: ValueRef, offset: usize) -> Result<(), ParseError> {
        if self.value_map.insert(name, value).is_some() {
            return Err(ParseError::new(
                format!("redefinition of value '%{name}'"),
                offset,
            ));
        }
        Ok(())
    }

    fn resolve(&self, names: &[&str], offset: usize) -> Result<Vec<ValueRef>, ParseError> {
        names
            .iter()
            .map(|name| {
                self.value_map.get(name).copied().ok_or_else(|| {
                    ParseError::new(format!("use of undefined value '%{name}'"), offset)
                })
            })
            .collect()
    }

    fn add_input(&mut self, name: &'a str, raw: &RawType<'_>, offset: usize) -> Result<(), ParseError> {
        let ty = self.build_type(raw, offset)?;
        let value = self.ctx.add_input(ty);
        self.define(name, value, offset)
    }

    fn build_op(
        &mut self,
        result: &'a str,
        op_name: &str,
        operands: &[&str],
        ty: Option<&RawType<'_>>,
        offset: usize,
    ) -> Result<(), ParseError> {
        let operands = self.resolve(operands, offset)?;
        let ty = ty.map(|t| self.build_type(t, offset)).transpose()?;

        let op = match op_name {
            "transpose" | "reshape" => {
                let [input] = operands[..] else {
                    return Err(ParseError::new(
                        format!(
                            "toy.{op_name} expects 1 operand, found {}",
                            operands.len()
                        ),
                        offset,
                    ));
                };
                if op_name == "transpose" {
                    ops::transpose(&mut self.ctx, input, ty).op_ref()
                } else {
                    let ty = ty.ok_or_else(|| {
                        ParseError::new("toy.reshape requires a result type", offset)
                    })?;
                    ops::reshape(&mut self.ctx, input, ty).op_ref()
                }
            }
            "return" | "graph" => {
                return Err(ParseError::new(
                    format!("toy.{op_name} cannot produce a value"),
                    offset,
                ));
            }
            _ => {
                let ty = match ty {
                    Some(ty) => ty,
                    None => self.ctx.types.intern(TypeData::unranked(ElementKind::F64)),
                };
                ops::other(&mut self.ctx, op_name, operands, ty)
            }
        };

        self.ctx.push_op(op);
        let value = self.ctx.op_result(op);
        self.define(result, value, offset)
    }
}

// ============================================================================
// Public API
// ============================================================================

fn offset_of(input: &str, rest: &str) -> usize {
    input.len() - rest.len()
}

/// Parse a Toy graph from its textual representation.
pub fn parse_graph(input: &str) -> Result<IrContext, ParseError> {
    let mut remaining = input;

    let header = raw_header.parse_next(&mut remaining).map_err(|_| {
        ParseError::new(
            "expected `toy.graph @name(%arg: type, ...) {`",
            offset_of(input, remaining),
        )
    })?;

    let mut builder = GraphBuilder::new(header.name);
    for arg in &header.args {
        builder.add_input(arg.name, &arg.ty, input.len() - arg.rest_len)?;
    }

    let mut outputs: Option<Vec<ValueRef>> = None;
    loop {
        // `ws` never fails; it only skips input.
        let _ = ws.parse_next(&mut remaining);
        if remaining.is_empty() || remaining.starts_with('}') {
            break;
        }

        let offset = offset_of(input, remaining);
        let stmt = raw_statement.parse_next(&mut remaining).map_err(|_| {
            ParseError::new("expected `%name = toy.<op> ...` or `toy.return`", offset)
        })?;

        if outputs.is_some() {
            return Err(ParseError::new("statement after toy.return", offset));
        }
        match stmt {
            RawStatement::Op {
                result,
                op_name,
                operands,
                ty,
            } => builder.build_op(result, op_name, &operands, ty.as_ref(), offset)?,
            RawStatement::Return { operands } => {
                outputs = Some(builder.resolve(&operands, offset)?);
            }
        }
    }

    if !remaining.starts_with('}') {
        return Err(ParseError::new(
            "expected `}` closing the graph",
            offset_of(input, remaining),
        ));
    }
    remaining = &remaining[1..];
    let _ = ws.parse_next(&mut remaining);
    if !remaining.is_empty() {
        return Err(ParseError::new(
            "trailing input after graph",
            offset_of(input, remaining),
        ));
    }

    let outputs = outputs.ok_or_else(|| {
        ParseError::new("graph is missing toy.return", offset_of(input, remaining))
    })?;

    let mut ctx = builder.ctx;
    ctx.set_outputs(outputs);
    Ok(ctx)
}

// ============================================================================
// Tests
// ============================================================================
