//! Authorization decision types.

use serde::{Deserialize, Serialize};

/// Severity the caller should log an authorization with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Which form of the command line an allowed execution uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// The rewritten, fully quoted command line.
    Restricted,
    /// The command line as received.
    Unrestricted,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Restricted => write!(f, "restricted"),
            ExecutionMode::Unrestricted => write!(f, "unrestricted"),
        }
    }
}

/// Broad class of a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// The command line is malformed.
    SyntaxError,
    /// Well formed, but classified as dangerous.
    ContentUnsafe,
    /// Well formed, but disallowed by mode or privilege.
    PolicyDenied,
}

/// Why a command line was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    SyntaxError,
    Unsafe,
    /// Restricted mode and the command is not `ProbablySafe`.
    NotAllowed,
    /// Unrestricted mode requested by an elevated process.
    ElevatedPrivileges,
}

impl Denial {
    pub fn kind(self) -> DenialKind {
        match self {
            Denial::SyntaxError => DenialKind::SyntaxError,
            Denial::Unsafe => DenialKind::ContentUnsafe,
            Denial::NotAllowed | Denial::ElevatedPrivileges => DenialKind::PolicyDenied,
        }
    }
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Denial::SyntaxError => write!(f, "syntax error"),
            Denial::Unsafe => write!(f, "command is unsafe"),
            Denial::NotAllowed => write!(f, "command not allowed"),
            Denial::ElevatedPrivileges => write!(f, "not allowed with elevated privileges"),
        }
    }
}

/// Result of [`CommandGate::authorize`](crate::CommandGate::authorize).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authorization {
    Allowed {
        /// The command line to hand to the process runner.
        command_line: String,
        mode: ExecutionMode,
        log_level: LogLevel,
    },
    Denied(Denial),
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Authorization::Allowed { .. })
    }

    /// Returns true if the decision blocks execution.
    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }

    /// The command line to run, if allowed.
    pub fn command_line(&self) -> Option<&str> {
        match self {
            Authorization::Allowed { command_line, .. } => Some(command_line),
            Authorization::Denied(_) => None,
        }
    }

    pub fn denial(&self) -> Option<Denial> {
        match self {
            Authorization::Allowed { .. } => None,
            Authorization::Denied(denial) => Some(*denial),
        }
    }

    /// Denials are always logged as errors.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Authorization::Allowed { log_level, .. } => *log_level,
            Authorization::Denied(_) => LogLevel::Error,
        }
    }
}

impl std::fmt::Display for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authorization::Allowed { command_line, mode, .. } => {
                write!(f, "ALLOW ({mode}): {command_line}")
            }
            Authorization::Denied(denial) => write!(f, "DENY: {denial}"),
        }
    }
}
