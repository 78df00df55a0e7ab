// src/core/builtin.rs

use crate::core::command::{Command, CommandRef};
use crate::core::commands::Commands;
use crate::core::entrypoint::Entrypoint;
use crate::core::errors::{CommandError, ExecError};
use crate::core::shellcomp::{Completions, Directive};
use crate::system::executor::Env;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Weak};

/// Runs a built-in command.
pub type ExecFn = Arc<dyn Fn(&Entrypoint, &[String], &Env) -> Result<(), ExecError> + Send + Sync>;

/// Produces shell completions for a built-in command.
pub type CompleteFn =
    Arc<dyn Fn(&Entrypoint, &[String], &Env) -> Result<Completions, CommandError> + Send + Sync>;

/// A command implemented in-process by the embedding application.
#[derive(Clone)]
pub struct BuiltinCommand {
    pub name: String,
    pub summary: String,
    pub help: String,
    exec: ExecFn,
    complete: Option<CompleteFn>,
}

impl BuiltinCommand {
    pub fn new(
        name: impl Into<String>,
        exec: impl Fn(&Entrypoint, &[String], &Env) -> Result<(), ExecError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            summary: String::new(),
            help: String::new(),
            exec: Arc::new(exec),
            complete: None,
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Without a completion function the command completes nothing.
    pub fn complete_with(
        mut self,
        complete: impl Fn(&Entrypoint, &[String], &Env) -> Result<Completions, CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.complete = Some(Arc::new(complete));
        self
    }

    pub(crate) fn exec(&self, entrypoint: &Entrypoint, args: &[String], env: &Env) -> Result<(), ExecError> {
        (self.exec)(entrypoint, args, env)
    }

    pub(crate) fn complete(
        &self,
        entrypoint: &Entrypoint,
        args: &[String],
        env: &Env,
    ) -> Result<Completions, CommandError> {
        match &self.complete {
            Some(complete) => complete(entrypoint, args, env),
            None => Ok(Completions::new(Vec::new(), Directive::NO_FILE_COMP)),
        }
    }
}

impl fmt::Debug for BuiltinCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinCommand")
            .field("name", &self.name)
            .field("summary", &self.summary)
            .field("completes", &self.complete.is_some())
            .finish_non_exhaustive()
    }
}

/// A named group of built-ins, listed in menus like any other module.
#[derive(Debug, Clone)]
pub struct BuiltinModule {
    pub name: String,
    pub summary: String,
    pub commands: Vec<Builtin>,
}

impl BuiltinModule {
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            commands: Vec::new(),
        }
    }

    pub fn command(mut self, command: impl Into<Builtin>) -> Self {
        self.commands.push(command.into());
        self
    }
}

/// Anything that can be prepended or appended to an entrypoint.
#[derive(Debug, Clone)]
pub enum Builtin {
    Command(BuiltinCommand),
    Module(BuiltinModule),
}

impl From<BuiltinCommand> for Builtin {
    fn from(command: BuiltinCommand) -> Self {
        Self::Command(command)
    }
}

impl From<BuiltinModule> for Builtin {
    fn from(module: BuiltinModule) -> Self {
        Self::Module(module)
    }
}

impl Builtin {
    pub fn name(&self) -> &str {
        match self {
            Self::Command(command) => &command.name,
            Self::Module(module) => &module.name,
        }
    }

    /// Places the built-in in the tree under `parent`. Built-ins report the
    /// entrypoint's executable as their path.
    pub(crate) fn materialize(&self, path: &Path, parent: &Weak<Command>) -> CommandRef {
        match self {
            Self::Command(command) => Command::builtin(command.clone(), path, parent),
            Self::Module(module) => {
                Command::builtin_module(&module.name, &module.summary, path, parent, |weak| {
                    module
                        .commands
                        .iter()
                        .map(|child| child.materialize(path, weak))
                        .collect::<Commands>()
                })
            }
        }
    }
}
