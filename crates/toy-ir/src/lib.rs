//! Toy IR crate.
//!
//! An arena-based op graph for the Toy tensor dialect. Operations and values
//! live in `cranelift-entity` maps owned by [`IrContext`], with eager
//! use-chains so that RAUW (replace all uses with) and dead-op checks are
//! cheap. On top of the graph sit the rewrite infrastructure (patterns, a
//! frozen registration table and a fixed-point driver), dead code
//! elimination, a verifier, and a text printer/parser.

// === Op graph ===
pub mod context;
pub mod ops;
pub mod refs;
pub mod types;

// === Rewriting and transforms ===
pub mod rewrite;
pub mod transforms;

// === Text format and checking ===
pub mod parser;
pub mod printer;
pub mod validation;

pub use context::{
    IrContext, OpClass, OpKind, OperationData, OperationDataBuilder, Use, User, ValueData,
};
pub use ops::{ReshapeOp, TransposeOp};
pub use parser::{ParseError, parse_graph};
pub use printer::print_graph;
pub use refs::{NameRef, OpRef, TypeRef, ValueDef, ValueRef};
pub use types::{ElementKind, NameInterner, TypeData, TypeInterner};
pub use validation::{VerifyError, verify};

// Re-export smallvec for downstream crates that build `TypeData` shapes
pub use smallvec;
