//! # acfs-manifest entry point
//!
//! Parses command-line arguments, initialises logging and hands off to the
//! compile driver.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use acfs_cli::compile::{run_compile, CompileArgs};
use acfs_cli::config::{CompilePaths, CompilerConfig};
use acfs_cli::{find_repo_root, resolve_path};

/// ACFS manifest compiler
///
/// Validates acfs.manifest.yaml, checks that every verified installer is
/// covered by checksums.yaml, and generates the bash installer tree under
/// scripts/generated/.
#[derive(Parser, Debug)]
#[command(name = "acfs-manifest", version, about, long_about = None)]
struct Cli {
    /// Verbose output: content previews under --dry-run. Repeat to raise the
    /// log level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Repository root (default: nearest ancestor containing acfs.manifest.yaml).
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Compiler configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    compile: CompileArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let repo_root = match &cli.root {
        Some(root) => resolve_path(root, &cwd),
        None => find_repo_root(&cwd).unwrap_or_else(|| {
            tracing::warn!("Could not locate repository root; using current directory");
            cwd.clone()
        }),
    };
    tracing::debug!(repo_root = %repo_root.display(), "resolved repository root");

    let config = match &cli.config {
        Some(path) => CompilerConfig::load(&resolve_path(path, &cwd))?,
        None => CompilerConfig::default(),
    };
    let paths = CompilePaths::resolve(&repo_root, &config, &cli.compile.overrides(&cwd));
    run_compile(&cli.compile, &paths, cli.verbose)
}
