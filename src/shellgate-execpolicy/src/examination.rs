//! Command-line examination results.

use serde::{Deserialize, Serialize};

/// Safety verdict for a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExaminationResult {
    /// A single invocation of a trusted program, no shell syntax.
    ProbablySafe,
    /// Shell syntax present, but every program involved is trusted.
    MaybeSafe,
    /// Untrusted, denied, or unvettable.
    NotSafe,
    /// The command line is not well formed.
    SyntaxError,
}

impl ExaminationResult {
    /// Integer code understood by the engine's C-style shell escape hooks.
    ///
    /// Only `2` may be run in restricted mode; `-1` is a syntax error and
    /// `0` must be refused by the caller.
    pub fn legacy_code(self) -> i32 {
        match self {
            Self::SyntaxError => -1,
            Self::ProbablySafe => 2,
            Self::MaybeSafe | Self::NotSafe => 0,
        }
    }

    pub fn is_runnable(self) -> bool {
        matches!(self, Self::ProbablySafe | Self::MaybeSafe)
    }
}

impl std::fmt::Display for ExaminationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProbablySafe => write!(f, "probably safe"),
            Self::MaybeSafe => write!(f, "maybe safe"),
            Self::NotSafe => write!(f, "not safe"),
            Self::SyntaxError => write!(f, "syntax error"),
        }
    }
}

/// Outcome of examining one command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExaminedCommand {
    /// The command line exactly as received.
    pub command_line: String,

    pub verdict: ExaminationResult,

    /// `argv[0]` of the original command line.
    pub program_name: String,

    /// Quoted rewrite of the first program invocation. Empty on syntax errors.
    pub safe_command_line: String,

    /// Words of the first program invocation.
    #[serde(default)]
    pub argv: Vec<String>,

    /// Program of every simple command, in order.
    #[serde(default)]
    pub programs: Vec<String>,

    /// Why the verdict is not `ProbablySafe`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ExaminedCommand {
    /// Result for a command line that could not be parsed.
    pub fn syntax_error(command_line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
            verdict: ExaminationResult::SyntaxError,
            program_name: String::new(),
            safe_command_line: String::new(),
            argv: Vec::new(),
            programs: Vec::new(),
            reason: Some(reason.into()),
        }
    }

    /// Legacy integer code for this verdict.
    pub fn legacy_code(&self) -> i32 {
        self.verdict.legacy_code()
    }
}
