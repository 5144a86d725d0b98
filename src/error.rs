//! Error type for the `toy` driver.

use std::path::PathBuf;

use derive_more::{Display, Error};
use toy_ir::{ParseError, VerifyError};

/// Where in the pipeline a verification failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    #[display("input")]
    Input,
    #[display("after canonicalization")]
    Canonicalized,
}

#[derive(Debug, Display, Error)]
pub enum ToyError {
    #[display("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[display("{line}:{column}: {}", source.message)]
    Parse {
        line: usize,
        column: usize,
        source: ParseError,
    },
    #[display("invalid graph ({stage}): {} verification error(s)", errors.len())]
    Verify {
        stage: Stage,
        errors: Vec<VerifyError>,
    },
}

impl ToyError {
    /// Wrap a parse error, resolving its offset against `input`.
    pub fn parse(input: &str, source: ParseError) -> Self {
        let (line, column) = source.line_col(input);
        ToyError::Parse {
            line,
            column,
            source,
        }
    }

    /// Individual verification failures, if this is a verification error.
    pub fn verify_errors(&self) -> &[VerifyError] {
        match self {
            ToyError::Verify { errors, .. } => errors,
            _ => &[],
        }
    }
}
