//! Toy dialect canonicalizer.
//!
//! Ties the IR and pass crates together into the pipeline used by `toyc`:
//! parse, verify, canonicalize, verify again, print.

use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use tracing::debug;

pub mod error;

pub use error::{Stage, ToyError};
pub use toy_ir;
pub use toy_passes;

use toy_ir::rewrite::FrozenPatternSet;
use toy_ir::{IrContext, parse_graph, print_graph, verify};
use toy_passes::{CanonicalizeConfig, CanonicalizeResult, canonicalize};

/// Pattern table shared by every graph processed in this process.
static PATTERNS: LazyLock<FrozenPatternSet> =
    LazyLock::new(toy_passes::toy_canonicalization_patterns);

/// The Toy canonicalization patterns, built on first use.
pub fn patterns() -> &'static FrozenPatternSet {
    &PATTERNS
}

/// Output of [`optimize_source`].
pub struct Optimized {
    pub ctx: IrContext,
    pub result: CanonicalizeResult,
    /// The canonicalized graph in text form.
    pub text: String,
}

/// Read a graph from `path`, or from stdin when `path` is `-`.
pub fn read_source(path: &Path) -> Result<String, ToyError> {
    let io_err = |source| ToyError::Io {
        path: path.to_path_buf(),
        source,
    };
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map_err(io_err)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).map_err(io_err)
    }
}

/// Parse and verify a graph.
pub fn load_graph(source: &str) -> Result<IrContext, ToyError> {
    let ctx = parse_graph(source).map_err(|e| ToyError::parse(source, e))?;
    verify(&ctx).map_err(|errors| ToyError::Verify {
        stage: Stage::Input,
        errors,
    })?;
    Ok(ctx)
}

/// Run the whole pipeline on IR text.
pub fn optimize_source(
    source: &str,
    config: &CanonicalizeConfig,
) -> Result<Optimized, ToyError> {
    let mut ctx = load_graph(source)?;
    debug!(graph = ctx.name(), ops = ctx.ops().len(), "graph loaded");

    let result = canonicalize(&mut ctx, patterns(), config);
    verify(&ctx).map_err(|errors| ToyError::Verify {
        stage: Stage::Canonicalized,
        errors,
    })?;

    let text = print_graph(&ctx);
    Ok(Optimized { ctx, result, text })
}
