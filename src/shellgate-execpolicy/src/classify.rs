//! Safety classification of parsed command lines.

use tracing::trace;

use crate::command::{ParsedCommand, SimpleCommand};
use crate::config::{ChainPolicy, GateConfig};
use crate::examination::ExaminationResult;
use crate::parser::QuoteStyle;

/// Verdict plus the reason it is not `ProbablySafe`.
pub(crate) type Classification = (ExaminationResult, Option<String>);

/// Applies a [`GateConfig`] to parsed command lines.
pub(crate) struct Classifier<'a> {
    pub config: &'a GateConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a GateConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, parsed: &ParsedCommand) -> Classification {
        if let Some(reason) = self.unsafe_reason(parsed) {
            trace!(command = %parsed.raw, %reason, "not safe");
            return (ExaminationResult::NotSafe, Some(reason));
        }

        let leading_trusted = parsed
            .commands
            .first()
            .is_some_and(|c| self.is_trusted(c));

        let shape = self.shape_issue(parsed);
        if leading_trusted && shape.is_none() {
            return (ExaminationResult::ProbablySafe, None);
        }

        let chain_trusted = match self.config.chain_policy {
            ChainPolicy::EveryProgram => parsed.commands.iter().all(|c| self.is_trusted(c)),
            ChainPolicy::LeadingProgram => leading_trusted,
        };
        if chain_trusted {
            return (ExaminationResult::MaybeSafe, shape.map(str::to_string));
        }

        let untrusted = parsed
            .commands
            .iter()
            .find(|c| !self.is_trusted(c))
            .and_then(SimpleCommand::program)
            .map(|w| w.text.as_str())
            .unwrap_or_default();
        (
            ExaminationResult::NotSafe,
            Some(format!("`{untrusted}` is not a trusted program")),
        )
    }

    fn is_trusted(&self, command: &SimpleCommand) -> bool {
        command
            .program()
            .is_some_and(|w| self.config.is_trusted(&w.text))
    }

    /// Conditions that make a command line `NotSafe` whatever the allow-list says.
    fn unsafe_reason(&self, parsed: &ParsedCommand) -> Option<String> {
        if parsed.has_substitution() {
            return Some("command substitution cannot be vetted".to_string());
        }
        if self.config.quote_style == QuoteStyle::Cmd {
            if let Some(reason) = cmd_hazard(&parsed.raw) {
                return Some(reason);
            }
        }
        for command in &parsed.commands {
            let Some(program) = command.program() else {
                return Some("no program to run".to_string());
            };
            if program.is_dynamic() {
                return Some(format!(
                    "program name `{}` is computed by the shell",
                    program.text
                ));
            }
            if self.config.is_denied(&program.text) {
                return Some(format!("`{}` is a denied program", program.text));
            }
        }
        None
    }

    /// First reason the command line is more than a plain invocation.
    fn shape_issue(&self, parsed: &ParsedCommand) -> Option<&'static str> {
        if parsed.has_shell_operators() {
            Some("contains shell operators")
        } else if parsed.has_redirections() {
            Some("contains redirections")
        } else if !parsed.is_single_invocation() {
            Some("more than one program invocation")
        } else if parsed.has_assignments() && !self.config.allow_env_assignments {
            Some("sets environment variables")
        } else if parsed.has_expansions() && !self.config.allow_expansions {
            Some("relies on shell expansion")
        } else {
            None
        }
    }
}

/// Text that `cmd.exe` reads differently from a POSIX shell. `cmd` has no
/// single quotes and no backslash escapes, and expands `%` and `!` even
/// inside double quotes.
fn cmd_hazard(raw: &str) -> Option<String> {
    if let Some(c) = raw.chars().find(|c| matches!(c, '%' | '!' | '^' | '\'')) {
        return Some(format!("`{c}` is interpreted differently by cmd.exe"));
    }
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek().is_some_and(|n| "\"&|<>()".contains(*n)) {
            return Some("backslash escapes are not understood by cmd.exe".to_string());
        }
    }
    None
}
