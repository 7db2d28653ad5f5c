//! The command gate: examination and authorization.

use tracing::debug;

use crate::classify::Classifier;
use crate::command::ParsedCommand;
use crate::config::GateConfig;
use crate::context::RuntimePolicy;
use crate::decision::{Authorization, Denial, ExecutionMode, LogLevel};
use crate::error::ParseError;
use crate::examination::{ExaminationResult, ExaminedCommand};
use crate::parser;

/// Decides whether shell command lines may run, and in which form.
///
/// Holds only immutable configuration, so a single gate can be shared
/// between threads.
#[derive(Debug, Clone, Default)]
pub struct CommandGate {
    config: GateConfig,
}

impl CommandGate {
    /// Creates a gate with the default allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Classify a command line. Never fails; malformed input yields
    /// [`ExaminationResult::SyntaxError`].
    pub fn examine(&self, command_line: &str) -> ExaminedCommand {
        let parsed = match ParsedCommand::from_shell_string(command_line) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(command = %command_line, error = %e, "command line does not parse");
                return ExaminedCommand::syntax_error(command_line, e.to_string());
            }
        };

        let argv = parsed.leading_argv();
        let (safe_command_line, unquotable) = match parser::rewrite_with(&argv, self.config.quote_style) {
            Ok(line) => (line, None),
            Err(e @ ParseError::Unquotable(_)) => (String::new(), Some(e.to_string())),
            Err(e) => return ExaminedCommand::syntax_error(command_line, e.to_string()),
        };

        let (verdict, reason) = match unquotable {
            Some(reason) => (ExaminationResult::NotSafe, Some(reason)),
            None => Classifier::new(&self.config).classify(&parsed),
        };
        debug!(command = %command_line, %verdict, "examined command line");

        ExaminedCommand {
            command_line: command_line.to_string(),
            verdict,
            program_name: parsed.program_name().to_string(),
            safe_command_line,
            argv,
            programs: parsed
                .commands
                .iter()
                .filter_map(|c| c.program().map(|w| w.text.clone()))
                .collect(),
            reason,
        }
    }

    /// Decide whether an examined command line may run under `policy`.
    ///
    /// Content safety is checked before mode and privilege: syntax errors
    /// and unsafe commands are refused whatever the policy says.
    pub fn authorize(&self, examined: &ExaminedCommand, policy: &RuntimePolicy) -> Authorization {
        match examined.verdict {
            ExaminationResult::SyntaxError => return Authorization::Denied(Denial::SyntaxError),
            ExaminationResult::NotSafe => return Authorization::Denied(Denial::Unsafe),
            ExaminationResult::ProbablySafe | ExaminationResult::MaybeSafe => {}
        }

        if policy.restricted_shell_mode {
            if examined.verdict != ExaminationResult::ProbablySafe {
                return Authorization::Denied(Denial::NotAllowed);
            }
            return Authorization::Allowed {
                command_line: examined.safe_command_line.clone(),
                mode: ExecutionMode::Restricted,
                log_level: LogLevel::Info,
            };
        }

        if !Self::allow_unrestricted_shell_escape(policy) {
            return Authorization::Denied(Denial::ElevatedPrivileges);
        }

        let log_level = if examined.verdict == ExaminationResult::ProbablySafe {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };
        Authorization::Allowed {
            command_line: examined.command_line.clone(),
            mode: ExecutionMode::Unrestricted,
            log_level,
        }
    }

    /// Examine and authorize in one step.
    pub fn evaluate(&self, command_line: &str, policy: &RuntimePolicy) -> (ExaminedCommand, Authorization) {
        let examined = self.examine(command_line);
        let authorization = self.authorize(&examined, policy);
        (examined, authorization)
    }

    /// Whether unrestricted shell escape is open to this process at all:
    /// Lua-only engines, non-elevated processes, or an explicit override.
    pub fn allow_unrestricted_shell_escape(policy: &RuntimePolicy) -> bool {
        policy.allows_unrestricted()
    }
}
