//! Runtime policy for authorization decisions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configured shell escape mode of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellCommandMode {
    /// No shell command may run.
    Forbidden,
    /// Only trusted programs, rewritten into their safe form.
    #[default]
    Restricted,
    /// Any well-formed command line that is not unsafe.
    Unrestricted,
}

impl ShellCommandMode {
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::Forbidden)
    }
}

impl FromStr for ShellCommandMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forbidden" | "disabled" | "off" => Ok(Self::Forbidden),
            "restricted" => Ok(Self::Restricted),
            "unrestricted" | "enabled" | "on" => Ok(Self::Unrestricted),
            other => Err(ConfigError::InvalidValue {
                key: "shell_command_mode".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ShellCommandMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forbidden => write!(f, "forbidden"),
            Self::Restricted => write!(f, "restricted"),
            Self::Unrestricted => write!(f, "unrestricted"),
        }
    }
}

/// Flags consulted by [`CommandGate::authorize`](crate::CommandGate::authorize).
///
/// Passed explicitly on every call; the gate never reads process state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimePolicy {
    /// Only `ProbablySafe` commands may run, in their rewritten form.
    pub restricted_shell_mode: bool,

    /// The engine runs with administrator/superuser rights.
    pub running_as_administrator: bool,

    /// Configuration override letting elevated processes use unrestricted
    /// shell escape.
    pub allow_unrestricted_for_admin: bool,

    /// The engine runs Lua-only (`texlua`).
    pub lua_only_mode: bool,
}

impl RuntimePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy for restricted shell escape.
    pub fn restricted() -> Self {
        Self {
            restricted_shell_mode: true,
            ..Default::default()
        }
    }

    /// Policy for unrestricted shell escape.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Builder: set restricted mode.
    #[must_use]
    pub fn with_restricted(mut self, restricted: bool) -> Self {
        self.restricted_shell_mode = restricted;
        self
    }

    /// Builder: set administrator status.
    #[must_use]
    pub fn with_administrator(mut self, is_admin: bool) -> Self {
        self.running_as_administrator = is_admin;
        self
    }

    /// Builder: set the administrator override.
    #[must_use]
    pub fn with_admin_override(mut self, allow: bool) -> Self {
        self.allow_unrestricted_for_admin = allow;
        self
    }

    /// Builder: set Lua-only mode.
    #[must_use]
    pub fn with_lua_only(mut self, lua_only: bool) -> Self {
        self.lua_only_mode = lua_only;
        self
    }

    /// Whether the privilege rules permit unrestricted shell escape.
    pub fn allows_unrestricted(&self) -> bool {
        self.lua_only_mode || !self.running_as_administrator || self.allow_unrestricted_for_admin
    }
}
