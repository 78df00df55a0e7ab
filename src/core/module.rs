// src/core/module.rs

use crate::constants::{DESCRIBE_CACHE_KEY, DESCRIBE_COMMANDS_FLAG, SUMMARY_CACHE_KEY};
use crate::core::command::{Command, CommandRef};
use crate::core::commands::Commands;
use crate::core::discovery::DiscoveryContext;
use crate::core::errors::{CommandError, CommandErrorKind};
use crate::core::executable::{
    cache_key, help_from_magic_comments, read_magic_comments, summary_from_magic_comments,
};
use crate::system::executor::Invocation;
use log::debug;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Where an executable module is in its one-time description of children.
#[derive(Debug)]
pub(crate) enum DiscoveryState {
    NotYetDiscovered,
    Discovered(Commands),
    Failed(CommandError),
}

/// The JSON an executable module prints for `--describe-commands`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Descriptor {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) summary: Option<String>,
    #[serde(default)]
    pub(crate) commands: Vec<Descriptor>,
}

/// A directory containing the module metadata file.
#[derive(Debug)]
pub(crate) struct DirectoryModule {
    directory: PathBuf,
    context: DiscoveryContext,
    subcommands: OnceLock<Commands>,
}

impl DirectoryModule {
    pub(crate) fn new(directory: PathBuf, context: DiscoveryContext) -> Self {
        Self {
            directory,
            context,
            subcommands: OnceLock::new(),
        }
    }

    /// Discovers the directory on first call; concurrent callers wait for that
    /// one scan. Problems with individual entries are reported to the observer
    /// and the rest of the listing is kept.
    pub(crate) fn subcommands(&self, command: &CommandRef) -> Commands {
        self.subcommands
            .get_or_init(|| {
                debug!("discovering module '{}' in {}", command.name(), self.directory.display());
                let (commands, errors) = self
                    .context
                    .discover_in(&self.directory, &Arc::downgrade(command));
                for error in &errors {
                    self.context.observer().on_error(error);
                }
                Commands::from(commands)
            })
            .clone()
    }

    /// Read from the metadata file's `# SUMMARY:` comment.
    pub(crate) fn summary(&self, command: &CommandRef) -> Result<String, CommandError> {
        self.context
            .cache()
            .fetch(command.path(), SUMMARY_CACHE_KEY, &|| {
                read_magic_comments(command, CommandErrorKind::Summary, summary_from_magic_comments)
            })
    }

    pub(crate) fn help(&self, command: &CommandRef) -> Result<String, CommandError> {
        read_magic_comments(command, CommandErrorKind::Help, help_from_magic_comments)
    }
}

/// An executable that describes its subtree as JSON.
///
/// The module at the top of such a subtree fetches its descriptor lazily; the
/// modules nested inside it are built from that same descriptor and start out
/// already discovered.
#[derive(Debug)]
pub(crate) struct ExecutableModule {
    args: Vec<String>,
    context: DiscoveryContext,
    summary: OnceLock<String>,
    state: Mutex<DiscoveryState>,
}

impl ExecutableModule {
    pub(crate) fn lazy(args: Vec<String>, context: DiscoveryContext) -> Self {
        Self {
            args,
            context,
            summary: OnceLock::new(),
            state: Mutex::new(DiscoveryState::NotYetDiscovered),
        }
    }

    pub(crate) fn described(
        args: Vec<String>,
        context: DiscoveryContext,
        summary: String,
        children: Commands,
    ) -> Self {
        Self {
            args,
            context,
            summary: OnceLock::from(summary),
            state: Mutex::new(DiscoveryState::Discovered(children)),
        }
    }

    /// Runs `--describe-commands` once; a failure is remembered and returned
    /// to every later caller.
    pub(crate) fn subcommands(&self, command: &CommandRef) -> Result<Commands, CommandError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            DiscoveryState::Discovered(commands) => Ok(commands.clone()),
            DiscoveryState::Failed(error) => Err(error.clone()),
            DiscoveryState::NotYetDiscovered => {
                let outcome = self.discover(command);
                *state = match &outcome {
                    Ok(commands) => DiscoveryState::Discovered(commands.clone()),
                    Err(error) => DiscoveryState::Failed(error.clone()),
                };
                outcome
            }
        }
    }

    /// Taken from the descriptor, so it triggers discovery.
    pub(crate) fn summary(&self, command: &CommandRef) -> Result<String, CommandError> {
        self.subcommands(command)?;
        Ok(self.summary.get().cloned().unwrap_or_default())
    }

    fn discover(&self, command: &CommandRef) -> Result<Commands, CommandError> {
        debug!("describing module '{}' via {}", command.name(), command.path().display());
        let descriptor = self.describe(command)?;
        self.summary
            .get_or_init(|| descriptor.summary.clone().unwrap_or_default());

        let parent = Arc::downgrade(command);
        Ok(descriptor
            .commands
            .iter()
            .map(|child| Command::from_descriptor(child, command, &self.args, &parent, &self.context))
            .collect())
    }

    fn describe(&self, command: &CommandRef) -> Result<Descriptor, CommandError> {
        let invocation = Invocation::new(
            command.path(),
            self.args
                .iter()
                .cloned()
                .chain([DESCRIBE_COMMANDS_FLAG.to_string()])
                .collect(),
        );

        let parse = |output: &str| {
            serde_json::from_str::<Descriptor>(output).map_err(|e| {
                let message = format!(
                    "error parsing output from `{} {}`: {}",
                    command.path().display(),
                    DESCRIBE_COMMANDS_FLAG,
                    e
                );
                CommandError::new(CommandErrorKind::Describe, command, message, e)
            })
        };

        let key = cache_key(DESCRIBE_CACHE_KEY, &self.args);
        let output = self.context.cache().fetch(command.path(), &key, &|| {
            let output = self
                .context
                .executor()
                .capture_output(&invocation)
                .map_err(|e| CommandError::from_execution(CommandErrorKind::Describe, command, e))?;
            // Validate before the output can reach the cache.
            parse(&output)?;
            Ok(output)
        })?;

        parse(&output)
    }
}
