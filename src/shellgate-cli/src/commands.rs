//! Subcommand implementations.

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use shellgate_execpolicy::{CommandGate, ExaminedCommand, RuntimePolicy, ShellCommandMode, parser};
use shellgate_pipe::session::{CORE_SECTION, gate_config_from_session, keys, shell_command_mode};
use shellgate_pipe::{
    ConfigSession, EngineFlags, PipeDirection, PipeError, Session, ShellEscape,
    SystemProcessRunner,
};
use tracing::debug;

use crate::args::{CheckArgs, Cli, Commands, ExamineArgs, RunArgs, SplitArgs};

/// Run the parsed command line.
pub fn dispatch_command(cli: Cli) -> Result<ExitCode> {
    let session = load_session(cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();
    match cli.command {
        Commands::Examine(args) => {
            examine_cmd(&session, &args, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check(args) => {
            let allowed = check_cmd(&session, &args, &mut stdout)?;
            Ok(if allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Run(args) => {
            drop(stdout);
            run_cmd(session, &args)
        }
        Commands::Split(args) => {
            split_cmd(&args, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load the session from `path`, or discover the default configuration.
pub fn load_session(path: Option<&Path>) -> Result<ConfigSession> {
    match path {
        Some(path) => ConfigSession::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => ConfigSession::discover().context("failed to load configuration"),
    }
}

fn gate(session: &ConfigSession) -> Result<CommandGate> {
    let config = gate_config_from_session(session).context("invalid gate configuration")?;
    Ok(CommandGate::with_config(config))
}

pub fn examine_cmd(session: &ConfigSession, args: &ExamineArgs, out: &mut dyn Write) -> Result<()> {
    let examined = gate(session)?.examine(&args.line);
    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&examined)?)?;
    } else {
        print_examined(&examined, out)?;
    }
    Ok(())
}

fn print_examined(examined: &ExaminedCommand, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "verdict:   {} ({})",
        examined.verdict,
        examined.legacy_code()
    )?;
    writeln!(out, "program:   {}", examined.program_name)?;
    writeln!(out, "safe line: {}", examined.safe_command_line)?;
    if !examined.programs.is_empty() {
        writeln!(out, "programs:  {}", examined.programs.join(", "))?;
    }
    if let Some(reason) = &examined.reason {
        writeln!(out, "reason:    {reason}")?;
    }
    Ok(())
}

/// Prints the decision; returns whether the command line may run.
/// Decide a command line the way `run` would, with the privileges given by
/// the flags. The mode comes from the flags, then the session.
pub fn check_cmd(session: &ConfigSession, args: &CheckArgs, out: &mut dyn Write) -> Result<bool> {
    let mode = if args.restricted {
        ShellCommandMode::Restricted
    } else {
        match args.shell_mode {
            Some(mode) => mode.into(),
            None => shell_command_mode(session).context("invalid shell command mode")?,
        }
    };
    let configured_override = session
        .config_bool(CORE_SECTION, keys::ALLOW_UNRESTRICTED_SUPER_USER)
        .context("invalid administrator override")?
        .unwrap_or(false);
    let policy = RuntimePolicy::new()
        .with_restricted(mode == ShellCommandMode::Restricted)
        .with_administrator(args.admin)
        .with_admin_override(args.admin_override || configured_override)
        .with_lua_only(args.lua_only);
    debug!(%mode, ?policy, "checking command line");

    let gate = gate(session)?;
    if !mode.is_enabled() {
        let examined = gate.examine(&args.line);
        if args.json {
            let value = serde_json::json!({
                "mode": mode,
                "examination": examined,
                "authorization": null,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        } else {
            print_examined(&examined, out)?;
            writeln!(out, "decision:  shell escape is disabled")?;
        }
        return Ok(false);
    }

    let (examined, authorization) = gate.evaluate(&args.line, &policy);
    if args.json {
        let value = serde_json::json!({
            "mode": mode,
            "examination": examined,
            "authorization": authorization,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    } else {
        print_examined(&examined, out)?;
        writeln!(out, "decision:  {authorization}")?;
    }
    Ok(authorization.is_allowed())
}

pub fn run_cmd(session: ConfigSession, args: &RunArgs) -> Result<ExitCode> {
    let mut flags = EngineFlags::new();
    if let Some(mode) = args.shell_mode {
        flags = flags.with_shell_mode(mode.into());
    }
    let escape = ShellEscape::new(Arc::new(session), Box::new(SystemProcessRunner::new()), flags)
        .context("invalid shell escape configuration")?;

    let direction = if args.write {
        PipeDirection::Write
    } else {
        PipeDirection::Read
    };
    let mut stream = match escape.open_pipe(&args.line, direction) {
        Ok(stream) => stream,
        Err(PipeError::Denied(denial)) => bail!("{denial}: {}", args.line),
        Err(e) => return Err(e).context("failed to open pipe"),
    };

    match direction {
        PipeDirection::Read => {
            io::copy(&mut stream, &mut io::stdout().lock())?;
        }
        PipeDirection::Write => {
            io::copy(&mut io::stdin().lock(), &mut stream)?;
        }
    }

    let code = stream
        .close()?
        .and_then(|status| status.code())
        .and_then(|code| u8::try_from(code).ok());
    Ok(code.map_or(ExitCode::FAILURE, ExitCode::from))
}

pub fn split_cmd(args: &SplitArgs, out: &mut dyn Write) -> Result<()> {
    let argv = parser::split_words(&args.line)
        .with_context(|| format!("cannot split {:?}", args.line))?;
    for word in argv {
        writeln!(out, "{word}")?;
    }
    Ok(())
}
