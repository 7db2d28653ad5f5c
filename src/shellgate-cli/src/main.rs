//! Shellgate CLI - Main entry point.
//!
//! - `examine` classifies a command line
//! - `check` applies a runtime policy to it
//! - `run` opens a gated pipe through the system shell
//! - `split` prints the argv of a command line

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use shellgate_cli::{Cli, LogLevel, dispatch_command};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if let Some(level) = cli.log_level {
        level
    } else if let Ok(env_level) = std::env::var("SHELLGATE_LOG_LEVEL") {
        LogLevel::from_str_loose(&env_level).unwrap_or_default()
    } else {
        LogLevel::default()
    };

    // RUST_LOG wins when set; stdout carries pipe output.
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.as_filter_str().to_string());
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_writer(std::io::stderr)
        .init();

    dispatch_command(cli)
}
