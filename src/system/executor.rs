// EN: src/system/executor.rs

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

/// The environment handed to a command: a complete replacement, not an overlay.
pub type Env = HashMap<String, String>;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{command}' exited with a non-zero error code ({code}).")]
    NonZeroExitStatus { command: String, code: i32 },
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// A fully specified process invocation: program, argument list and optional environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Option<Env>,
}

impl Invocation {
    /// Creates an invocation of `program` with `args`, inheriting the current environment.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: None,
        }
    }

    /// Replaces the environment of the child process.
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = Some(env);
        self
    }

    /// A shell-quoted rendering of the command line, used for logs and error messages.
    pub fn command_line(&self) -> String {
        let program = self.program.to_string_lossy();
        let parts = std::iter::once(&*program).chain(self.args.iter().map(String::as_str));
        shlex::try_join(parts).unwrap_or_else(|_| {
            // Fall back to a plain join when an argument contains a NUL byte.
            std::iter::once(program.to_string())
                .chain(self.args.iter().cloned())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    fn build(&self) -> StdCommand {
        let mut command = StdCommand::new(dunce::simplified(&self.program));
        command.args(&self.args);
        if let Some(env) = &self.env {
            command.env_clear().envs(env);
        }
        command
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// The seam between the command tree and the operating system.
///
/// Discovery only ever needs `capture_output`; `run` is used once a command has
/// been resolved and is handed the terminal.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Runs the invocation to completion and returns its standard output.
    /// Standard error is discarded and stdin is closed.
    fn capture_output(&self, invocation: &Invocation) -> Result<String, ExecutionError>;

    /// Runs the invocation attached to the current terminal and returns its exit code.
    fn run(&self, invocation: &Invocation) -> Result<i32, ExecutionError>;
}

/// The default executor, backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn capture_output(&self, invocation: &Invocation) -> Result<String, ExecutionError> {
        let command_line = invocation.command_line();
        log::debug!("exec (capture): {}", command_line);

        let output = invocation
            .build()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| ExecutionError::CommandFailed(command_line.clone(), e))?;

        if !output.status.success() {
            return Err(ExecutionError::NonZeroExitStatus {
                command: command_line,
                code: output.status.code().unwrap_or(-1),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ExecutionError::InvalidUtf8Output {
            command: command_line,
            source: e,
        })
    }

    fn run(&self, invocation: &Invocation) -> Result<i32, ExecutionError> {
        let command_line = invocation.command_line();
        log::debug!("exec: {}", command_line);

        let status = invocation
            .build()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| ExecutionError::CommandFailed(command_line, e))?;

        Ok(exit_code_of(status))
    }
}

#[cfg(unix)]
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    // A child killed by a signal reports 128 + signal, as shells do.
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(crate::constants::EXIT_NOT_OK)
}

#[cfg(not(unix))]
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(crate::constants::EXIT_NOT_OK)
}
