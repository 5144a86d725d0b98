//! Command-line interface for the Toy canonicalizer.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "toyc")]
#[command(about = "Toy dialect canonicalizer", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Canonicalize a graph and print the result to stdout
    Opt {
        /// Input file, or `-` for stdin
        input: PathBuf,

        /// Maximum rewrite passes before giving up
        #[arg(long, default_value_t = 10)]
        max_iterations: usize,

        /// Keep operations left without uses by the rewrites
        #[arg(long)]
        no_dce: bool,

        /// Print rewrite statistics to stderr
        #[arg(long)]
        stats: bool,
    },
    /// Parse and verify a graph without rewriting it
    Verify {
        /// Input file, or `-` for stdin
        input: PathBuf,
    },
}
