//! Shell escape glue between the engine and the command gate.

use std::borrow::Cow;
use std::sync::Arc;

use shellgate_execpolicy::parser;
use shellgate_execpolicy::{
    Authorization, CommandGate, ConfigError, ExaminedCommand, LogLevel, ParseError, RuntimePolicy,
    ShellCommandMode,
};
use tracing::{debug, error, info, warn};

use crate::error::PipeError;
use crate::runner::{PipeDirection, PipeStream, ProcessRunner};
use crate::session::{self, Session};

/// Engine-side settings that are not part of the session configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineFlags {
    /// Command-line override of the configured shell command mode.
    pub shell_mode: Option<ShellCommandMode>,
    /// The engine runs Lua-only (`texlua`).
    pub lua_only: bool,
}

impl EngineFlags {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_shell_mode(mut self, mode: ShellCommandMode) -> Self {
        self.shell_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_lua_only(mut self, lua_only: bool) -> Self {
        self.lua_only = lua_only;
        self
    }
}

/// Runs the engine's shell escapes (`\write18`, `io.popen`, `os.execute`)
/// through a [`CommandGate`].
pub struct ShellEscape {
    gate: CommandGate,
    mode: ShellCommandMode,
    flags: EngineFlags,
    session: Arc<dyn Session>,
    runner: Box<dyn ProcessRunner>,
}

impl ShellEscape {
    /// Build the glue from the session's configuration.
    pub fn new(
        session: Arc<dyn Session>,
        runner: Box<dyn ProcessRunner>,
        flags: EngineFlags,
    ) -> Result<Self, ConfigError> {
        let config = session::gate_config_from_session(session.as_ref())?;
        let mode = match flags.shell_mode {
            Some(mode) => mode,
            None => session::shell_command_mode(session.as_ref())?,
        };
        debug!(%mode, allowed = ?config.allowed_commands, "shell escape configured");
        Ok(Self {
            gate: CommandGate::with_config(config),
            mode,
            flags,
            session,
            runner,
        })
    }

    pub fn gate(&self) -> &CommandGate {
        &self.gate
    }

    pub fn mode(&self) -> ShellCommandMode {
        self.mode
    }

    /// Current runtime policy. Privileges and the administrator override
    /// are read from the session on every call.
    pub fn runtime_policy(&self) -> Result<RuntimePolicy, ConfigError> {
        session::runtime_policy_from_session(self.session.as_ref(), self.flags.with_shell_mode(self.mode))
    }

    /// Legacy check used by `\write18`: `-1` syntax error, `2` probably
    /// safe, `0` otherwise.
    pub fn shell_cmd_is_allowed(&self, command_line: &str) -> (i32, ExaminedCommand) {
        shellgate_execpolicy::shell_cmd_is_allowed(&self.gate, &normalize_quotes(command_line))
    }

    /// Whether unrestricted shell escape is open to this process.
    /// A malformed override value counts as not set.
    pub fn allow_unrestricted_shell_escape(&self) -> bool {
        match self.runtime_policy() {
            Ok(policy) => CommandGate::allow_unrestricted_shell_escape(&policy),
            Err(e) => {
                warn!(error = %e, "ignoring invalid shell escape configuration");
                self.flags.lua_only || !self.session.running_as_administrator()
            }
        }
    }

    /// Open a pipe to `command_line`, like `io.popen`.
    pub fn open_pipe(&self, command_line: &str, direction: PipeDirection) -> Result<PipeStream, PipeError> {
        if !self.mode.is_enabled() {
            error!(command = %command_line, %direction, "shell escape is disabled");
            return Err(PipeError::Disabled);
        }

        let command_line = normalize_quotes(command_line);
        let policy = self.runtime_policy()?;
        let (examined, authorization) = self.gate.evaluate(&command_line, &policy);
        let verdict = examined.verdict;

        let (to_run, mode, log_level) = match authorization {
            Authorization::Allowed {
                command_line,
                mode,
                log_level,
            } => (command_line, mode, log_level),
            Authorization::Denied(denial) => {
                error!(command = %command_line, %direction, %verdict, "{denial}: {command_line}");
                return Err(PipeError::Denied(denial));
            }
        };

        match log_level {
            LogLevel::Info => info!(
                command = %to_run, %direction, %verdict,
                "initiating {mode} {direction} pipe stream: {to_run}"
            ),
            LogLevel::Warn => warn!(
                command = %to_run, %direction, %verdict,
                "initiating {mode} {direction} pipe stream: {to_run}"
            ),
            LogLevel::Error => error!(
                command = %to_run, %direction, %verdict,
                "initiating {mode} {direction} pipe stream: {to_run}"
            ),
        }

        Ok(self.runner.open_pipe(&to_run, direction)?)
    }

    /// Run a program directly with its arguments and return the exit code.
    ///
    /// The caller is expected to have authorized the command already.
    pub fn spawn_command(&self, program: &str, args: &[String]) -> Result<i32, PipeError> {
        if !self.mode.is_enabled() {
            return Err(PipeError::Disabled);
        }
        debug!(program, ?args, "spawning command");
        Ok(self.runner.run(program, args)?)
    }

    /// Replace the engine process with `program`, like `os.exec`.
    ///
    /// The caller is expected to have authorized the command already.
    /// Returns only when the process could not be replaced.
    pub fn exec_command(&self, program: &str, args: &[String]) -> Result<(), PipeError> {
        if !self.mode.is_enabled() {
            error!(program, "shell escape is disabled");
            return Err(PipeError::Disabled);
        }
        info!(program, ?args, "executing command");
        Ok(self.runner.exec(program, args)?)
    }

    /// Split a command line into argv, first word being the program.
    pub fn split_command(&self, command_line: &str) -> Result<Vec<String>, ParseError> {
        parser::split_words(command_line)
    }
}

impl std::fmt::Debug for ShellEscape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellEscape")
            .field("gate", &self.gate)
            .field("mode", &self.mode)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// `cmd.exe` does not understand single quotes.
fn normalize_quotes(command_line: &str) -> Cow<'_, str> {
    if cfg!(windows) && command_line.contains('\'') {
        Cow::Owned(command_line.replace('\'', "\""))
    } else {
        Cow::Borrowed(command_line)
    }
}
