// src/core/observer.rs

use crate::core::command::CommandRef;
use crate::core::entrypoint::Entrypoint;
use crate::core::errors::Error;
use colored::Colorize;
use std::fmt;

/// Receives the events the engine does not treat as fatal.
///
/// An observer is handed to the entrypoint at construction and threaded
/// through discovery, so separate trees never share callbacks.
pub trait Observer: Send + Sync + fmt::Debug {
    /// A broken symlink, unreadable directory, cache failure or misbehaving command.
    fn on_error(&self, error: &Error);

    /// `command` is the unresolved name (see [`Command::is_null`](crate::core::command::Command::is_null))
    /// and `suggestions` the closest known commands, best first.
    fn on_command_not_found(
        &self,
        entrypoint: &Entrypoint,
        command: &CommandRef,
        suggestions: &[CommandRef],
    );
}

/// Logs errors at `warn` and prints the not-found notice to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl Observer for LoggingObserver {
    fn on_error(&self, error: &Error) {
        log::warn!("{}", error);
    }

    fn on_command_not_found(
        &self,
        entrypoint: &Entrypoint,
        command: &CommandRef,
        suggestions: &[CommandRef],
    ) {
        eprintln!(
            "{}",
            format!(
                t!("identify.not_found"),
                program = entrypoint.name(),
                usage = entrypoint.relative_usage(command).bold()
            )
        );

        if !suggestions.is_empty() {
            eprintln!("{}", t!("identify.did_you_mean"));
            for suggestion in suggestions {
                eprintln!("   {}", suggestion.usage());
            }
        }
    }
}
