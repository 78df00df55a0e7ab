// src/core/errors.rs

use crate::core::cache::CacheError;
use crate::core::command::{Command, CommandRef};
use crate::system::executor::ExecutionError;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use thiserror::Error;

/// The cause behind a command or discovery error, shared so errors stay cloneable.
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// Which part of the command protocol was not honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorKind {
    /// `--summary`, `# SUMMARY:` or the module metadata file.
    Summary,
    /// `--help` or the `# HELP:` block.
    Help,
    /// `--describe-commands` failed or printed something that is not a descriptor.
    Describe,
    /// `--complete` failed or printed something that is not a completion list.
    Completion,
}

/// A discovered command failed to honour its contract.
///
/// Only the listing of that one command is affected; callers usually report the
/// error and carry on with the rest of the tree.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct CommandError {
    kind: CommandErrorKind,
    message: String,
    command: Weak<Command>,
    #[source]
    cause: Cause,
}

impl CommandError {
    pub(crate) fn new(
        kind: CommandErrorKind,
        command: &CommandRef,
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            command: Arc::downgrade(command),
            cause: Arc::new(cause),
        }
    }

    /// Wraps a failed subprocess, naming the operation by the command's usage string.
    pub(crate) fn from_execution(
        kind: CommandErrorKind,
        command: &CommandRef,
        error: ExecutionError,
    ) -> Self {
        let operation = match kind {
            CommandErrorKind::Summary => "summary",
            CommandErrorKind::Help => "help",
            CommandErrorKind::Describe => "describe",
            CommandErrorKind::Completion => "complete",
        };
        let message = format!("{}('{}'): {}", operation, command.usage(), error);
        Self::new(kind, command, message, error)
    }

    /// What the command failed to provide.
    pub fn kind(&self) -> CommandErrorKind {
        self.kind
    }

    /// The offending command, if it is still part of a live tree.
    pub fn command(&self) -> Option<CommandRef> {
        self.command.upgrade()
    }

    /// The underlying failure.
    pub fn cause(&self) -> &Cause {
        &self.cause
    }
}

/// Something went wrong while classifying an entry or reading a directory.
#[derive(Error, Debug, Clone)]
#[error("error discovering commands in {}: {cause}", .path.display())]
pub struct DiscoveryError {
    pub path: PathBuf,
    #[source]
    pub cause: Cause,
}

impl DiscoveryError {
    pub(crate) fn new(
        path: impl Into<PathBuf>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            cause: Arc::new(cause),
        }
    }
}

/// A symlink in a search path could not be resolved to a real file.
#[derive(Error, Debug, Clone)]
#[error("broken symlink {}: {cause}", .path.display())]
pub struct SymlinkError {
    pub path: PathBuf,
    #[source]
    pub cause: Cause,
}

impl SymlinkError {
    pub(crate) fn new(path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        Self {
            path: path.into(),
            cause: Arc::new(cause),
        }
    }
}

/// A module on the way to the requested command could not list its children.
///
/// Carries how far identification got, so callers can still name the module
/// that broke or show its usage.
#[derive(Error, Debug, Clone)]
#[error("{error}")]
pub struct IdentifyError {
    /// The deepest command reached: the module whose subcommands failed.
    pub command: CommandRef,
    /// The arguments not yet consumed, starting with the name being looked up.
    pub args: Vec<String>,
    pub error: CommandError,
}

impl From<IdentifyError> for CommandError {
    fn from(e: IdentifyError) -> Self {
        e.error
    }
}

/// Every non-fatal error class the engine reports to an [`Observer`](crate::core::observer::Observer).
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Symlink(#[from] SymlinkError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// The outcome of executing a resolved command, carrying the exit code the process should use.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The command ran and exited unsuccessfully.
    #[error("exited with status {0}")]
    Exited(i32),
    /// Nothing in the tree matched the requested name.
    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),
    /// A built-in rejected its arguments.
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Identify(#[from] IdentifyError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// The exit code a frontend should terminate with.
    pub fn exit_code(&self) -> i32 {
        use crate::constants::{
            EXIT_INTERNAL_ERROR, EXIT_NOT_OK, EXIT_UNKNOWN_SUBCOMMAND, EXIT_USAGE_ERROR,
        };
        match self {
            Self::Exited(code) => *code,
            Self::UnknownSubcommand(_) => EXIT_UNKNOWN_SUBCOMMAND,
            Self::Usage(_) => EXIT_USAGE_ERROR,
            Self::Command(_) | Self::Identify(_) => EXIT_INTERNAL_ERROR,
            Self::Execution(_) | Self::Io(_) => EXIT_NOT_OK,
        }
    }
}
