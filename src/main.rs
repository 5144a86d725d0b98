//! `toyc` entry point.

mod cli;

use std::path::Path;

use clap::Parser;
use cli::{Cli, Command};
use toy::{ToyError, load_graph, optimize_source, read_source};
use toy_passes::{CanonicalizeConfig, CanonicalizeResult};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Opt {
            input,
            max_iterations,
            no_dce,
            stats,
        } => {
            let config = CanonicalizeConfig {
                max_iterations,
                remove_dead_code: !no_dce,
            };
            run_opt(&input, &config, stats)
        }
        Command::Verify { input } => run_verify(&input),
    };

    if let Err((input, e)) = result {
        report(&input, &e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` overrides the level picked by `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

type CliResult = Result<(), (String, ToyError)>;

fn display_name(path: &Path) -> String {
    if path.as_os_str() == "-" {
        "<stdin>".to_owned()
    } else {
        path.display().to_string()
    }
}

fn run_opt(path: &Path, config: &CanonicalizeConfig, stats: bool) -> CliResult {
    let name = display_name(path);
    let optimized = read_source(path)
        .and_then(|source| optimize_source(&source, config))
        .map_err(|e| (name.clone(), e))?;

    print!("{}", optimized.text);
    if stats {
        print_stats(&name, &optimized.result);
    }
    Ok(())
}

fn run_verify(path: &Path) -> CliResult {
    let name = display_name(path);
    let ctx = read_source(path)
        .and_then(|source| load_graph(&source))
        .map_err(|e| (name.clone(), e))?;

    eprintln!("{name}: ok ({} operation(s))", ctx.ops().len());
    Ok(())
}

fn print_stats(name: &str, result: &CanonicalizeResult) {
    let rewrite = &result.rewrite;
    eprintln!("=== Statistics: {name} ===");
    eprintln!(
        "  passes:      {}{}",
        rewrite.iterations,
        if rewrite.reached_fixpoint {
            ""
        } else {
            " (iteration cap reached)"
        }
    );
    eprintln!("  rewrites:    {}", rewrite.total_changes);
    match result.dce {
        Some(dce) => eprintln!("  removed ops: {}", dce.removed_count),
        None => eprintln!("  removed ops: - (dead code elimination disabled)"),
    }
}

fn report(input: &str, e: &ToyError) {
    match e {
        ToyError::Io { .. } => eprintln!("error: {e}"),
        ToyError::Parse { .. } => eprintln!("error: {input}:{e}"),
        ToyError::Verify { .. } => eprintln!("error: {input}: {e}"),
    }
    for err in e.verify_errors() {
        eprintln!("  {err}");
    }
}
