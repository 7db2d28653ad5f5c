//! Error types for the shell escape gate.

use thiserror::Error;

/// Errors raised while splitting a command line.
///
/// The gate never surfaces these to its callers; they are folded into
/// [`ExaminationResult::SyntaxError`](crate::ExaminationResult::SyntaxError).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing but whitespace
    #[error("empty command line")]
    Empty,

    /// A `'` without its closing partner
    #[error("unbalanced single quote starting at byte {0}")]
    UnbalancedSingleQuote(usize),

    /// A `"` without its closing partner
    #[error("unbalanced double quote starting at byte {0}")]
    UnbalancedDoubleQuote(usize),

    /// A `$(` or backtick substitution that never ends
    #[error("unterminated command substitution starting at byte {0}")]
    UnterminatedSubstitution(usize),

    /// A `\` as the very last character
    #[error("trailing backslash")]
    TrailingBackslash,

    /// NUL cannot be passed through a process command line
    #[error("command line contains a NUL byte")]
    NulByte,

    /// A control operator with no command on one side
    #[error("missing command around `{0}`")]
    DanglingOperator(String),

    /// A character `cmd.exe` interprets even inside double quotes
    #[error("`{}` cannot be quoted for cmd.exe", .0.escape_default())]
    Unquotable(char),

    /// A redirection with no target word
    #[error("missing redirection target after `{0}`")]
    MissingRedirectTarget(String),
}

/// Errors that can occur while loading gate configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was present but unusable
    #[error("invalid value for `{key}`: {value}")]
    InvalidValue { key: String, value: String },
}
