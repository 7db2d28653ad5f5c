//! Shellgate CLI library: argument definitions and subcommands.

#[cfg(test)]
mod tests;

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, LogLevel};
pub use commands::dispatch_command;
