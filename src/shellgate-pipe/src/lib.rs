#![allow(clippy::missing_errors_doc, clippy::uninlined_format_args)]
//! Shellgate Pipe - runs engine shell escapes through the command gate.
//!
//! [`ShellEscape`] ties a [`Session`] (configuration and privileges) and a
//! [`ProcessRunner`] to a [`CommandGate`](shellgate_execpolicy::CommandGate).
//! Every pipe is examined and authorized before a process is started, and
//! each decision is logged once.


mod error;
mod escape;
mod runner;
pub mod session;

pub use error::PipeError;
pub use escape::{EngineFlags, ShellEscape};
pub use runner::{PipeDirection, PipeStream, ProcessRunner, SystemProcessRunner};
pub use session::{ConfigSession, Session};
