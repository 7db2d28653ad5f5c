//! Process collaborator: pipe streams and command execution.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::{debug, trace};

use crate::error::PipeError;

/// Direction of a pipe stream, seen from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeDirection {
    /// The caller reads the child's standard output.
    Read,
    /// The caller writes to the child's standard input.
    Write,
}

impl PipeDirection {
    /// Parse a `popen`-style mode string (`r`, `w`, optionally followed by `b`).
    pub fn from_mode(mode: &str) -> Result<Self, PipeError> {
        match mode {
            "r" | "rb" => Ok(Self::Read),
            "w" | "wb" => Ok(Self::Write),
            other => Err(PipeError::InvalidMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for PipeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipeDirection::Read => write!(f, "input"),
            PipeDirection::Write => write!(f, "output"),
        }
    }
}

/// An open pipe to a child process.
///
/// Implements [`Read`] for [`PipeDirection::Read`] streams and [`Write`]
/// for [`PipeDirection::Write`] streams; the other half returns
/// [`io::ErrorKind::Unsupported`].
pub struct PipeStream {
    direction: PipeDirection,
    child: Option<Child>,
    reader: Option<Box<dyn Read + Send>>,
    writer: Option<Box<dyn Write + Send>>,
}

impl PipeStream {
    /// Spawn `command` with the standard stream matching `direction` piped.
    pub fn spawn(mut command: Command, direction: PipeDirection) -> io::Result<Self> {
        match direction {
            PipeDirection::Read => {
                command.stdin(Stdio::null()).stdout(Stdio::piped());
            }
            PipeDirection::Write => {
                command.stdin(Stdio::piped()).stdout(Stdio::inherit());
            }
        }
        let mut child = command.spawn()?;
        trace!(pid = child.id(), %direction, "spawned pipe child");

        let reader = child
            .stdout
            .take()
            .map(|out| Box::new(out) as Box<dyn Read + Send>);
        let writer = child
            .stdin
            .take()
            .map(|stdin| Box::new(stdin) as Box<dyn Write + Send>);
        Ok(Self {
            direction,
            child: Some(child),
            reader,
            writer,
        })
    }

    /// A read stream over an in-process source, for runners that do not
    /// spawn processes.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            direction: PipeDirection::Read,
            child: None,
            reader: Some(Box::new(reader)),
            writer: None,
        }
    }

    /// A write stream into an in-process sink.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            direction: PipeDirection::Write,
            child: None,
            reader: None,
            writer: Some(Box::new(writer)),
        }
    }

    pub fn direction(&self) -> PipeDirection {
        self.direction
    }

    /// Close the stream and wait for the child, like `pclose`.
    ///
    /// Returns `None` for streams without a child process.
    pub fn close(mut self) -> io::Result<Option<ExitStatus>> {
        self.finish()
    }

    fn finish(&mut self) -> io::Result<Option<ExitStatus>> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        self.reader = None;
        match self.child.take() {
            Some(mut child) => {
                let status = child.wait()?;
                debug!(%status, "pipe child exited");
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }
}

impl Read for PipeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(buf),
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "pipe stream is not open for reading",
            )),
        }
    }
}

impl Write for PipeStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "pipe stream is not open for writing",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for PipeStream {
    fn drop(&mut self) {
        // Reap the child so it does not linger as a zombie.
        let _ = self.finish();
    }
}

impl std::fmt::Debug for PipeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeStream")
            .field("direction", &self.direction)
            .field("pid", &self.child.as_ref().map(Child::id))
            .finish()
    }
}

/// Starts the processes behind shell escapes.
pub trait ProcessRunner: Send + Sync {
    /// Start `command_line` through the system shell with a pipe in
    /// `direction`.
    fn open_pipe(&self, command_line: &str, direction: PipeDirection) -> io::Result<PipeStream>;

    /// Run `program` with `args` directly, without a shell, and wait for it.
    /// Returns the exit code, or -1 when the child was killed by a signal.
    fn run(&self, program: &str, args: &[String]) -> io::Result<i32>;

    /// Replace the current process with `program`, like `os.exec`.
    ///
    /// Returns only when the program could not be started, or when the
    /// runner cannot replace the calling process.
    fn exec(&self, program: &str, args: &[String]) -> io::Result<()>;
}

/// Runs commands through `sh -c` (or `cmd /C` on Windows).
#[derive(Debug, Clone, Default)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn shell_command(command_line: &str) -> Command {
        let shell = if cfg!(windows) { "cmd" } else { "sh" };
        let shell_arg = if cfg!(windows) { "/C" } else { "-c" };
        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg).arg(command_line);
        cmd
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn open_pipe(&self, command_line: &str, direction: PipeDirection) -> io::Result<PipeStream> {
        PipeStream::spawn(Self::shell_command(command_line), direction)
    }

    fn run(&self, program: &str, args: &[String]) -> io::Result<i32> {
        let status = Command::new(program).args(args).status()?;
        Ok(status.code().unwrap_or(-1))
    }

    #[cfg(unix)]
    fn exec(&self, program: &str, args: &[String]) -> io::Result<()> {
        use std::os::unix::process::CommandExt;

        debug!(program, "replacing process");
        Err(Command::new(program).args(args).exec())
    }

    /// No `execv` here: run the child and exit with its code.
    #[cfg(not(unix))]
    fn exec(&self, program: &str, args: &[String]) -> io::Result<()> {
        let code = self.run(program, args)?;
        debug!(program, code, "exiting with child status");
        std::process::exit(code)
    }
}
