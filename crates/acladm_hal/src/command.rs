//! Command execution and management
//!
//! Thin wrapper over `std::process::Command` that maps spawn failures into
//! `HalError` and can feed stdin to the child before collecting its output.

use crate::error::{HalError, HalResult};
use std::ffi::OsStr;
use std::io::Write;
use std::process::{Command as StdCommand, Stdio};

/// Command builder and executor
pub struct Command {
    program: String,
    inner: StdCommand,
}

impl Command {
    /// Create a new command with the given program
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_string_lossy().into_owned(),
            inner: StdCommand::new(program),
        }
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.inner.arg(arg);
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.inner.args(args);
        self
    }

    /// Execute the command and capture output
    pub fn output(&mut self) -> HalResult<CommandResult> {
        let output = self
            .inner
            .stdin(Stdio::null())
            .output()
            .map_err(|e| HalError::io_error(&format!("spawn {}", self.program), None, e))?;
        Ok(CommandResult::from_output(output))
    }

    /// Execute the command with `input` written to its stdin, then capture output
    pub fn output_with_input(&mut self, input: &[u8]) -> HalResult<CommandResult> {
        let mut child = self
            .inner
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| HalError::io_error(&format!("spawn {}", self.program), None, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(input) {
                Ok(()) => {}
                // child quit without reading; its exit status and stderr say why
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(HalError::io_error(&format!("write stdin of {}", self.program), None, e)),
            }
            // stdin dropped here so the child sees EOF
        }

        let output = child
            .wait_with_output()
            .map_err(|e| HalError::io_error(&format!("wait {}", self.program), None, e))?;
        Ok(CommandResult::from_output(output))
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandResult {
    fn from_output(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }

    /// Check if the command was successful
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Get stdout as string (lossy)
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Get stderr as string (lossy)
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Convert a non-zero exit into `HalError::Process` carrying the tool's diagnostic
    pub fn into_checked(self, program: &str) -> HalResult<Self> {
        if self.success() {
            return Ok(self);
        }
        let mut message = self.stderr_string();
        if message.trim().is_empty() {
            message = self.stdout_string();
        }
        Err(HalError::process_error(program, self.exit_code, &message))
    }
}

/// Check if a command exists in PATH
pub fn command_exists<S: AsRef<OsStr>>(command: S) -> bool {
    which::which(command).is_ok()
}
