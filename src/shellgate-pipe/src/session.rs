//! Session collaborator: configuration values and process privileges.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use shellgate_execpolicy::{ChainPolicy, ConfigError, GateConfig, RuntimePolicy, ShellCommandMode};
use tracing::debug;

use crate::escape::EngineFlags;

/// Section holding the shell escape settings.
pub const CORE_SECTION: &str = "core";

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable for a custom config file path.
pub const SHELLGATE_CONFIG_ENV: &str = "SHELLGATE_CONFIG";

/// Keys read from [`CORE_SECTION`].
pub mod keys {
    pub const ALLOW_UNRESTRICTED_SUPER_USER: &str = "allow_unrestricted_super_user";
    pub const SHELL_COMMAND_MODE: &str = "shell_command_mode";
    pub const ALLOWED_SHELL_COMMANDS: &str = "allowed_shell_commands";
    pub const DENIED_SHELL_COMMANDS: &str = "denied_shell_commands";
    pub const SHELL_CHAIN_POLICY: &str = "shell_chain_policy";
    pub const SHELL_ALLOW_ENV_ASSIGNMENTS: &str = "shell_allow_env_assignments";
    pub const SHELL_ALLOW_EXPANSIONS: &str = "shell_allow_expansions";
}

/// What the shell escape glue needs from the surrounding session.
pub trait Session: Send + Sync {
    /// Raw configuration value.
    fn config_value(&self, section: &str, key: &str) -> Option<String>;

    /// Whether the process has administrator/superuser rights.
    fn running_as_administrator(&self) -> bool;

    /// Boolean configuration value.
    fn config_bool(&self, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
        self.config_value(section, key)
            .map(|value| {
                parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value,
                })
            })
            .transpose()
    }

    /// List configuration value, split on `;`, `,` or whitespace.
    fn config_list(&self, section: &str, key: &str) -> Option<Vec<String>> {
        self.config_value(section, key).map(|value| {
            value
                .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

/// Accepts the spellings TeX configuration files use for booleans.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "yes" | "on" => Some(true),
        "f" | "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Whether the current process runs with elevated privileges.
#[cfg(unix)]
pub fn is_elevated() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Whether the current process runs with elevated privileges.
#[cfg(not(unix))]
pub fn is_elevated() -> bool {
    // TODO: query the process token elevation on Windows.
    false
}

/// Build the gate configuration from session values, starting from the
/// defaults for anything not set.
pub fn gate_config_from_session(session: &dyn Session) -> Result<GateConfig, ConfigError> {
    let mut config = GateConfig::default();
    if let Some(allowed) = session.config_list(CORE_SECTION, keys::ALLOWED_SHELL_COMMANDS) {
        config.allowed_commands = allowed;
    }
    if let Some(denied) = session.config_list(CORE_SECTION, keys::DENIED_SHELL_COMMANDS) {
        config.denied_commands = denied;
    }
    if let Some(policy) = session.config_value(CORE_SECTION, keys::SHELL_CHAIN_POLICY) {
        config.chain_policy = ChainPolicy::from_str(&policy)?;
    }
    if let Some(allow) = session.config_bool(CORE_SECTION, keys::SHELL_ALLOW_ENV_ASSIGNMENTS)? {
        config.allow_env_assignments = allow;
    }
    if let Some(allow) = session.config_bool(CORE_SECTION, keys::SHELL_ALLOW_EXPANSIONS)? {
        config.allow_expansions = allow;
    }
    Ok(config)
}

/// Configured shell escape mode, restricted when unset.
pub fn shell_command_mode(session: &dyn Session) -> Result<ShellCommandMode, ConfigError> {
    session
        .config_value(CORE_SECTION, keys::SHELL_COMMAND_MODE)
        .map(|mode| ShellCommandMode::from_str(&mode))
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Runtime policy for the session's privileges and the engine flags.
///
/// The flags' shell mode wins over the configured one.
pub fn runtime_policy_from_session(
    session: &dyn Session,
    flags: EngineFlags,
) -> Result<RuntimePolicy, ConfigError> {
    let mode = match flags.shell_mode {
        Some(mode) => mode,
        None => shell_command_mode(session)?,
    };
    let admin_override = session
        .config_bool(CORE_SECTION, keys::ALLOW_UNRESTRICTED_SUPER_USER)?
        .unwrap_or(false);
    Ok(RuntimePolicy::new()
        .with_restricted(mode == ShellCommandMode::Restricted)
        .with_administrator(session.running_as_administrator())
        .with_admin_override(admin_override)
        .with_lua_only(flags.lua_only))
}

/// TOML-backed session.
#[derive(Debug, Clone, Default)]
pub struct ConfigSession {
    sections: BTreeMap<String, BTreeMap<String, String>>,
    administrator: Option<bool>,
}

impl ConfigSession {
    /// An empty session; privileges are taken from the running process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `[section]` tables of scalar or array values.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(s)?;
        let mut session = Self::new();
        for (section, value) in table {
            let toml::Value::Table(entries) = value else {
                return Err(ConfigError::InvalidValue {
                    key: section,
                    value: "expected a [section] table".to_string(),
                });
            };
            for (key, value) in entries {
                session.set(&section, &key, value_to_string(value));
            }
        }
        Ok(session)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading shellgate configuration");
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load from `$SHELLGATE_CONFIG` or `~/.shellgate/config.toml`; an
    /// absent default file yields an empty session.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Ok(val) = std::env::var(SHELLGATE_CONFIG_ENV) {
            if !val.is_empty() {
                return Self::load(Path::new(&val));
            }
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::new()),
        }
    }

    /// Builder: set a value.
    #[must_use]
    pub fn with_value(mut self, section: &str, key: &str, value: impl Into<String>) -> Self {
        self.set(section, key, value.into());
        self
    }

    /// Builder: pin the administrator status instead of probing the process.
    #[must_use]
    pub fn with_administrator(mut self, administrator: bool) -> Self {
        self.administrator = Some(administrator);
        self
    }

    fn set(&mut self, section: &str, key: &str, value: String) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}

impl Session for ConfigSession {
    fn config_value(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section)?.get(key).cloned()
    }

    fn running_as_administrator(&self) -> bool {
        self.administrator.unwrap_or_else(is_elevated)
    }
}

/// `~/.shellgate/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".shellgate").join(CONFIG_FILE))
}

fn value_to_string(value: toml::Value) -> String {
    match value {
        toml::Value::String(s) => s,
        toml::Value::Array(items) => items
            .into_iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(";"),
        other => other.to_string(),
    }
}
