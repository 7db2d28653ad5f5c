//! Gate configuration: trusted programs and the accepted grammar.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parser::QuoteStyle;

/// Programs a TeX distribution trusts in restricted mode out of the box.
pub const DEFAULT_ALLOWED_COMMANDS: &[&str] = &[
    "bibtex",
    "bibtex8",
    "extractbb",
    "gregorio",
    "kpsewhich",
    "makeindex",
    "r-mpost",
    "repstopdf",
    "texosquery-jre8",
];

/// How many programs of a chained command line must be trusted for it to be
/// considered `MaybeSafe`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainPolicy {
    /// Every simple command must run a trusted program.
    #[default]
    EveryProgram,
    /// Only the first simple command must run a trusted program.
    LeadingProgram,
}

impl FromStr for ChainPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "every_program" | "every" | "all" => Ok(Self::EveryProgram),
            "leading_program" | "leading" | "first" => Ok(Self::LeadingProgram),
            other => Err(ConfigError::InvalidValue {
                key: "chain_policy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration for the command gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Trusted programs. A bare name matches only a bare `argv[0]`; a path
    /// matches only that exact path.
    pub allowed_commands: Vec<String>,

    /// Programs that make any command line `NotSafe`, matched by base name.
    pub denied_commands: Vec<String>,

    pub chain_policy: ChainPolicy,

    /// Accept leading `NAME=value` words in a `ProbablySafe` invocation.
    pub allow_env_assignments: bool,

    /// Accept parameter, tilde and glob expansion in a `ProbablySafe`
    /// invocation.
    pub allow_expansions: bool,

    /// Shell the command lines are handed to. Defaults to the platform's.
    pub quote_style: QuoteStyle,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            allowed_commands: DEFAULT_ALLOWED_COMMANDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            denied_commands: Vec::new(),
            chain_policy: ChainPolicy::default(),
            allow_env_assignments: false,
            allow_expansions: false,
            quote_style: QuoteStyle::native(),
        }
    }
}

impl GateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration that trusts nothing.
    pub fn empty() -> Self {
        Self {
            allowed_commands: Vec::new(),
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Whether `program` is on the allow-list.
    pub fn is_trusted(&self, program: &str) -> bool {
        !program.is_empty() && self.allowed_commands.iter().any(|c| c == program)
    }

    /// Whether `program`, by base name, is on the deny-list.
    pub fn is_denied(&self, program: &str) -> bool {
        let basename = program.rsplit(['/', '\\']).next().unwrap_or(program);
        let stem = basename
            .strip_suffix(".exe")
            .or_else(|| basename.strip_suffix(".EXE"))
            .unwrap_or(basename);
        self.denied_commands.iter().any(|c| c == stem || c == basename)
    }

    /// Builder: trust a program.
    #[must_use]
    pub fn with_allowed_command(mut self, program: impl Into<String>) -> Self {
        self.allowed_commands.push(program.into());
        self
    }

    /// Builder: deny a program.
    #[must_use]
    pub fn with_denied_command(mut self, program: impl Into<String>) -> Self {
        self.denied_commands.push(program.into());
        self
    }

    /// Builder: set the chain policy.
    #[must_use]
    pub fn with_chain_policy(mut self, chain_policy: ChainPolicy) -> Self {
        self.chain_policy = chain_policy;
        self
    }

    /// Builder: accept environment assignments.
    #[must_use]
    pub fn with_env_assignments(mut self, allow: bool) -> Self {
        self.allow_env_assignments = allow;
        self
    }

    /// Builder: accept expansions.
    #[must_use]
    pub fn with_expansions(mut self, allow: bool) -> Self {
        self.allow_expansions = allow;
        self
    }

    /// Builder: set the target shell's quoting style.
    #[must_use]
    pub fn with_quote_style(mut self, quote_style: QuoteStyle) -> Self {
        self.quote_style = quote_style;
        self
    }
}
