//! Integration tests running real processes through the system shell.

#![cfg(unix)]

use std::io::{Read, Write};
use std::sync::Arc;

use shellgate_execpolicy::{Denial, ShellCommandMode};
use shellgate_pipe::session::{CORE_SECTION, keys};
use shellgate_pipe::{
    ConfigSession, EngineFlags, PipeDirection, PipeError, ProcessRunner, ShellEscape,
    SystemProcessRunner,
};

fn system_escape(mode: ShellCommandMode, allowed: &str) -> ShellEscape {
    let session = ConfigSession::new()
        .with_value(CORE_SECTION, keys::ALLOWED_SHELL_COMMANDS, allowed)
        .with_administrator(false);
    let flags = EngineFlags::new().with_shell_mode(mode);
    ShellEscape::new(Arc::new(session), Box::new(SystemProcessRunner::new()), flags)
        .expect("valid configuration")
}

// ============================================================================
// SYSTEM RUNNER TESTS
// ============================================================================

mod system_runner {
    use super::*;

    #[test]
    fn test_read_pipe_captures_output() {
        let runner = SystemProcessRunner::new();
        let mut stream = runner
            .open_pipe("echo hello; echo world", PipeDirection::Read)
            .expect("sh should start");
        let mut output = String::new();
        stream.read_to_string(&mut output).expect("read output");
        let status = stream.close().expect("wait").expect("child status");
        assert!(status.success());
        assert_eq!(output, "hello\nworld\n");
    }

    #[test]
    fn test_write_pipe_feeds_stdin() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("out.txt");
        let runner = SystemProcessRunner::new();
        let command = format!("cat > '{}'", target.display());
        let mut stream = runner
            .open_pipe(&command, PipeDirection::Write)
            .expect("sh should start");
        stream.write_all(b"from the engine\n").expect("write");
        stream.close().expect("wait");
        let written = std::fs::read_to_string(&target).expect("output file");
        assert_eq!(written, "from the engine\n");
    }

    #[test]
    fn test_run_reports_exit_code() {
        let runner = SystemProcessRunner::new();
        let code = runner
            .run("sh", &["-c".to_string(), "exit 3".to_string()])
            .expect("sh should start");
        assert_eq!(code, 3);
    }

    #[test]
    fn test_run_missing_program() {
        let runner = SystemProcessRunner::new();
        assert!(runner.run("shellgate-no-such-program", &[]).is_err());
    }

    #[test]
    fn test_exec_missing_program_returns_error() {
        let runner = SystemProcessRunner::new();
        let err = runner
            .exec("shellgate-no-such-program", &["x".to_string()])
            .expect_err("exec of a missing program returns");
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);

        let escape = system_escape(ShellCommandMode::Restricted, "kpsewhich");
        assert!(matches!(
            escape.exec_command("shellgate-no-such-program", &[]),
            Err(PipeError::Io(_))
        ));
    }
}

// ============================================================================
// GATED PIPE TESTS
// ============================================================================

mod gated_pipes {
    use super::*;

    #[test]
    fn test_restricted_pipe_runs_rewritten_line() {
        let escape = system_escape(ShellCommandMode::Restricted, "echo");
        // The rewrite quotes `;`, so echo prints it instead of running `id`.
        let mut stream = escape
            .open_pipe("echo 'a;id'", PipeDirection::Read)
            .expect("echo is trusted");
        let mut output = String::new();
        stream.read_to_string(&mut output).expect("read output");
        stream.close().expect("wait");
        assert_eq!(output, "a;id\n");
    }

    #[test]
    fn test_restricted_pipe_refuses_chains() {
        let escape = system_escape(ShellCommandMode::Restricted, "echo");
        let err = escape
            .open_pipe("echo a; echo b", PipeDirection::Read)
            .expect_err("chains are not probably safe");
        assert_eq!(err.denial(), Some(Denial::NotAllowed));
    }

    #[test]
    fn test_unrestricted_pipe_runs_chain() {
        let escape = system_escape(ShellCommandMode::Unrestricted, "echo");
        let mut stream = escape
            .open_pipe("echo a; echo b", PipeDirection::Read)
            .expect("trusted chain");
        let mut output = String::new();
        stream.read_to_string(&mut output).expect("read output");
        stream.close().expect("wait");
        assert_eq!(output, "a\nb\n");
    }

    #[test]
    fn test_forbidden_mode() {
        let escape = system_escape(ShellCommandMode::Forbidden, "echo");
        assert!(matches!(
            escape.open_pipe("echo a", PipeDirection::Read),
            Err(PipeError::Disabled)
        ));
    }
}
