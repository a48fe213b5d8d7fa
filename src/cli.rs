// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `localgrid`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "localgrid",
    version,
    about = "Run a batch of dependent shell jobs on this machine under a slot limit.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the job batch file (TOML).
    #[arg(value_name = "JOBS", default_value = "localgrid.toml")]
    pub jobs: PathBuf,

    /// Number of slots, overriding `[grid] slots`. `0` means one per CPU.
    #[arg(long, value_name = "N")]
    pub slots: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LOCALGRID_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse and validate the batch, print the submission order, but don't
    /// run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
