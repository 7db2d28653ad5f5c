#![allow(
    clippy::missing_errors_doc,
    clippy::uninlined_format_args,
    clippy::doc_markdown
)]
//! Shellgate Execpolicy - shell escape gate for TeX engines.
//!
//! Decides whether a command line handed over by `\write18`, `io.popen` or
//! `os.execute` may run, and in which form:
//!
//! - [`CommandGate::examine`] classifies a command line as `ProbablySafe`,
//!   `MaybeSafe`, `NotSafe` or `SyntaxError`, and produces a fully quoted
//!   rewrite of its first program invocation.
//! - [`CommandGate::authorize`] combines that verdict with the
//!   [`RuntimePolicy`] (restricted mode, elevated privileges, overrides).
//!
//! # Authorization order
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │              Command line                  │
//! └────────────────────┬───────────────────────┘
//!                      ▼
//!        syntax error / not safe? ──[Yes]──► DENY
//!                      │ [No]
//!                      ▼
//!          restricted shell mode?
//!        ┌─────────────┴─────────────┐
//!      [Yes]                        [No]
//!        ▼                           ▼
//!  probably safe?          elevated, no override,
//!   │        │               not Lua-only?
//! [Yes]     [No]           ┌─────────┴─────────┐
//!   ▼        ▼           [Yes]                [No]
//! ALLOW    DENY            ▼                   ▼
//! (safe line)            DENY          ALLOW (original line,
//!                                      INFO or WARN)
//! ```


mod classify;
mod command;
mod config;
mod context;
mod decision;
mod error;
mod examination;
mod gate;
pub mod parser;

// Re-export all public types
pub use command::{ParsedCommand, Redirection, SimpleCommand};
pub use config::{ChainPolicy, DEFAULT_ALLOWED_COMMANDS, GateConfig};
pub use context::{RuntimePolicy, ShellCommandMode};
pub use decision::{Authorization, Denial, DenialKind, ExecutionMode, LogLevel};
pub use error::{ConfigError, ParseError};
pub use examination::{ExaminationResult, ExaminedCommand};
pub use gate::CommandGate;
pub use parser::QuoteStyle;

// ============================================================================
// Convenience Functions
// ============================================================================

/// Examine a command line with the default allow-list.
pub fn examine(command_line: &str) -> ExaminedCommand {
    CommandGate::new().examine(command_line)
}

/// Legacy shell escape check: returns the integer verdict code together
/// with the examined command.
pub fn shell_cmd_is_allowed(gate: &CommandGate, command_line: &str) -> (i32, ExaminedCommand) {
    let examined = gate.examine(command_line);
    (examined.legacy_code(), examined)
}
