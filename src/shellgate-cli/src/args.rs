//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use shellgate_execpolicy::ShellCommandMode;

/// Examine, authorize and run TeX shell escape command lines.
#[derive(Debug, Parser)]
#[command(name = "shellgate", version, about)]
pub struct Cli {
    /// Configuration file (TOML with a `[core]` section)
    #[arg(long, global = true, env = "SHELLGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify a command line and show its safe rewrite
    Examine(ExamineArgs),

    /// Decide whether a command line may run under a policy
    Check(CheckArgs),

    /// Open a pipe to a command line through the gate
    Run(RunArgs),

    /// Split a command line into its argv
    Split(SplitArgs),
}

#[derive(Debug, Args)]
pub struct ExamineArgs {
    /// Command line to examine
    pub line: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Command line to check
    pub line: String,

    /// Restricted shell escape, short for `--shell-mode restricted`
    #[arg(long, conflicts_with = "shell_mode")]
    pub restricted: bool,

    /// Override the configured shell command mode
    #[arg(long, value_enum)]
    pub shell_mode: Option<ShellMode>,

    /// Lua-only engine (`texlua`)
    #[arg(long)]
    pub lua_only: bool,

    /// Pretend to run with administrator privileges
    #[arg(long)]
    pub admin: bool,

    /// Allow unrestricted shell escape for administrators
    #[arg(long)]
    pub admin_override: bool,

    /// Print the decision as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Command line to run
    pub line: String,

    /// Feed standard input to the command instead of reading its output
    #[arg(long)]
    pub write: bool,

    /// Override the configured shell command mode
    #[arg(long, value_enum)]
    pub shell_mode: Option<ShellMode>,
}

#[derive(Debug, Args)]
pub struct SplitArgs {
    /// Command line to split
    pub line: String,
}

/// Shell command mode as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShellMode {
    Forbidden,
    Restricted,
    Unrestricted,
}

impl From<ShellMode> for ShellCommandMode {
    fn from(mode: ShellMode) -> Self {
        match mode {
            ShellMode::Forbidden => ShellCommandMode::Forbidden,
            ShellMode::Restricted => ShellCommandMode::Restricted,
            ShellMode::Unrestricted => ShellCommandMode::Unrestricted,
        }
    }
}

/// Log level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors (default)
    #[default]
    Warn,
    /// Show informational messages, warnings, and errors
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}
