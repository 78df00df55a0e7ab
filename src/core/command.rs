// src/core/command.rs

use crate::core::builtin::BuiltinCommand;
use crate::core::commands::Commands;
use crate::core::discovery::DiscoveryContext;
use crate::core::entrypoint::Entrypoint;
use crate::core::errors::{CommandError, ExecError};
use crate::core::executable::{Executable, Flavor};
use crate::core::module::{Descriptor, DirectoryModule, ExecutableModule};
use crate::core::shellcomp::{Completions, Directive};
use crate::system::executor::Env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Arc, Weak};

/// Commands are shared between the tree, the resolver and worker threads.
pub type CommandRef = Arc<Command>;

/// A node of the command tree.
///
/// Every node has a name, a backing path and a non-owning link to its parent,
/// which is only used to rebuild usage strings. What the node can do depends on
/// its variant, fixed by the contract that built it.
pub struct Command {
    name: String,
    path: PathBuf,
    discovered_in: Option<PathBuf>,
    parent: Weak<Command>,
    kind: CommandKind,
}

pub(crate) enum CommandKind {
    /// A leaf backed by an executable file.
    Executable(Executable),
    /// A directory holding a metadata file; its children are discovered lazily.
    DirectoryModule(DirectoryModule),
    /// An executable that describes its own subtree through `--describe-commands`.
    ExecutableModule(ExecutableModule),
    /// An in-process command supplied by the embedding application.
    Builtin(BuiltinCommand),
    /// An in-process group of built-ins.
    BuiltinModule { summary: String, subcommands: Commands },
    /// The entrypoint itself.
    Root(Commands),
    /// A name that could not be resolved.
    Null,
}

impl Command {
    fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        discovered_in: Option<PathBuf>,
        parent: &Weak<Self>,
        kind: CommandKind,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            discovered_in,
            parent: parent.clone(),
            kind,
        }
    }

    /// A plain executable leaf.
    pub(crate) fn executable(
        name: impl Into<String>,
        path: &Path,
        parent: &Weak<Self>,
        flavor: Flavor,
        context: &DiscoveryContext,
    ) -> CommandRef {
        Arc::new(Self::new(
            name,
            path,
            path.parent().map(Path::to_path_buf),
            parent,
            CommandKind::Executable(Executable::new(Vec::new(), None, flavor, context.clone())),
        ))
    }

    /// A module whose children live in `directory`; `metadata_file` documents it.
    pub(crate) fn directory_module(
        name: impl Into<String>,
        metadata_file: PathBuf,
        directory: &Path,
        parent: &Weak<Self>,
        context: DiscoveryContext,
    ) -> CommandRef {
        Arc::new(Self::new(
            name,
            metadata_file,
            directory.parent().map(Path::to_path_buf),
            parent,
            CommandKind::DirectoryModule(DirectoryModule::new(directory.to_path_buf(), context)),
        ))
    }

    /// A protocol-described module whose descriptor has not been fetched yet.
    pub(crate) fn executable_module(
        name: impl Into<String>,
        path: &Path,
        parent: &Weak<Self>,
        context: DiscoveryContext,
    ) -> CommandRef {
        Arc::new(Self::new(
            name,
            path,
            path.parent().map(Path::to_path_buf),
            parent,
            CommandKind::ExecutableModule(ExecutableModule::lazy(Vec::new(), context)),
        ))
    }

    /// Builds the node for one descriptor entry, sharing `owner`'s backing file.
    ///
    /// The entry becomes a module only when it declares children and the
    /// context still has depth to spend; otherwise it is a leaf.
    pub(crate) fn from_descriptor(
        descriptor: &Descriptor,
        owner: &Self,
        args_prefix: &[String],
        parent: &Weak<Self>,
        context: &DiscoveryContext,
    ) -> CommandRef {
        let mut args = args_prefix.to_vec();
        args.push(descriptor.name.clone());

        if descriptor.commands.is_empty() || context.remaining_depth() == 0 {
            let leaf = Executable::new(
                args,
                descriptor.summary.clone(),
                Flavor::Binary,
                context.clone(),
            );
            return Arc::new(Self::new(
                descriptor.name.clone(),
                &owner.path,
                owner.discovered_in.clone(),
                parent,
                CommandKind::Executable(leaf),
            ));
        }

        let child_context = context.next();
        Arc::new_cyclic(|weak| {
            let children: Commands = descriptor
                .commands
                .iter()
                .map(|child| Self::from_descriptor(child, owner, &args, weak, &child_context))
                .collect();
            let module = ExecutableModule::described(
                args,
                child_context,
                descriptor.summary.clone().unwrap_or_default(),
                children,
            );
            Self::new(
                descriptor.name.clone(),
                &owner.path,
                owner.discovered_in.clone(),
                parent,
                CommandKind::ExecutableModule(module),
            )
        })
    }

    pub(crate) fn builtin(definition: BuiltinCommand, path: &Path, parent: &Weak<Self>) -> CommandRef {
        let name = definition.name.clone();
        Arc::new(Self::new(name, path, None, parent, CommandKind::Builtin(definition)))
    }

    pub(crate) fn builtin_module(
        name: impl Into<String>,
        summary: impl Into<String>,
        path: &Path,
        parent: &Weak<Self>,
        subcommands: impl FnOnce(&Weak<Self>) -> Commands,
    ) -> CommandRef {
        let (name, summary) = (name.into(), summary.into());
        Arc::new_cyclic(|weak| {
            let subcommands = subcommands(weak);
            Self::new(
                name,
                path,
                None,
                parent,
                CommandKind::BuiltinModule {
                    summary,
                    subcommands,
                },
            )
        })
    }

    pub(crate) fn root(
        name: impl Into<String>,
        path: &Path,
        subcommands: impl FnOnce(&Weak<Self>) -> Commands,
    ) -> CommandRef {
        let name = name.into();
        Arc::new_cyclic(|weak| {
            let subcommands = subcommands(weak);
            Self::new(name, path, None, &Weak::new(), CommandKind::Root(subcommands))
        })
    }

    /// The sentinel returned when `name` does not exist under `parent`.
    pub(crate) fn null(name: impl Into<String>, parent: &Weak<Self>) -> CommandRef {
        Arc::new(Self::new(name, PathBuf::new(), None, parent, CommandKind::Null))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backing file. Directory modules report their metadata file and
    /// built-ins report the entrypoint's executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory this command was found in, if it came from the filesystem.
    pub fn discovered_in(&self) -> Option<&Path> {
        self.discovered_in.as_deref()
    }

    pub fn parent(&self) -> Option<CommandRef> {
        self.parent.upgrade()
    }

    pub(crate) fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// True for every node that can hold subcommands.
    pub fn is_module(&self) -> bool {
        matches!(
            self.kind,
            CommandKind::DirectoryModule(_)
                | CommandKind::ExecutableModule(_)
                | CommandKind::BuiltinModule { .. }
                | CommandKind::Root(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, CommandKind::Null)
    }

    /// True for commands supplied in-process rather than discovered.
    pub fn is_builtin(&self) -> bool {
        matches!(
            self.kind,
            CommandKind::Builtin(_) | CommandKind::BuiltinModule { .. }
        )
    }

    /// The full invocation of this command, e.g. `go mod tidy`.
    pub fn usage(&self) -> String {
        self.usage_relative_to(None)
    }

    /// The invocation of this command below `ancestor`: `tidy` relative to `go mod`.
    pub fn usage_relative_to(&self, ancestor: Option<&Self>) -> String {
        self.args_relative_to(ancestor).join(" ")
    }

    /// The names from just below `ancestor` (or from the root) down to this command.
    pub fn args_relative_to(&self, ancestor: Option<&Self>) -> Vec<String> {
        let is_ancestor = |command: &Self| ancestor.is_some_and(|a| ptr::eq(command, a));
        if is_ancestor(self) {
            return Vec::new();
        }

        let mut names = vec![self.name.clone()];
        let mut current = self.parent.upgrade();
        while let Some(command) = current {
            if is_ancestor(&*command) {
                break;
            }
            names.push(command.name.clone());
            current = command.parent.upgrade();
        }
        names.reverse();
        names
    }

    /// The short description shown in menus.
    pub fn summary(self: &Arc<Self>) -> Result<String, CommandError> {
        match &self.kind {
            CommandKind::Executable(executable) => executable.summary(self),
            CommandKind::DirectoryModule(module) => module.summary(self),
            CommandKind::ExecutableModule(module) => module.summary(self),
            CommandKind::Builtin(definition) => Ok(definition.summary.clone()),
            CommandKind::BuiltinModule { summary, .. } => Ok(summary.clone()),
            CommandKind::Root(_) | CommandKind::Null => Ok(String::new()),
        }
    }

    /// The long help text. Menus are built separately for modules.
    pub fn help(self: &Arc<Self>) -> Result<String, CommandError> {
        match &self.kind {
            CommandKind::Executable(executable) => executable.help(self),
            CommandKind::DirectoryModule(module) => module.help(self),
            CommandKind::Builtin(definition) => Ok(definition.help.clone()),
            CommandKind::ExecutableModule(_)
            | CommandKind::BuiltinModule { .. }
            | CommandKind::Root(_)
            | CommandKind::Null => Ok(String::new()),
        }
    }

    /// The children of a module, discovering them on first use.
    /// Leaves have none.
    pub fn subcommands(self: &Arc<Self>) -> Result<Commands, CommandError> {
        match &self.kind {
            CommandKind::DirectoryModule(module) => Ok(module.subcommands(self)),
            CommandKind::ExecutableModule(module) => module.subcommands(self),
            CommandKind::BuiltinModule { subcommands, .. } | CommandKind::Root(subcommands) => {
                Ok(subcommands.clone())
            }
            CommandKind::Executable(_) | CommandKind::Builtin(_) | CommandKind::Null => {
                Ok(Commands::default())
            }
        }
    }

    /// Runs the command. Modules print their menu.
    pub fn exec(
        self: &Arc<Self>,
        entrypoint: &Entrypoint,
        args: &[String],
        env: &Env,
    ) -> Result<(), ExecError> {
        match &self.kind {
            CommandKind::Executable(executable) => executable.exec(self, args, env),
            CommandKind::Builtin(definition) => definition.exec(entrypoint, args, env),
            CommandKind::DirectoryModule(_)
            | CommandKind::ExecutableModule(_)
            | CommandKind::BuiltinModule { .. }
            | CommandKind::Root(_) => entrypoint.print_module_help(self, args),
            CommandKind::Null => Err(ExecError::UnknownSubcommand(self.usage())),
        }
    }

    /// Shell completions for the last of `args`.
    pub fn complete(
        self: &Arc<Self>,
        entrypoint: &Entrypoint,
        args: &[String],
        env: &Env,
    ) -> Result<Completions, CommandError> {
        match &self.kind {
            CommandKind::Executable(executable) => executable.complete(self, args, env),
            CommandKind::Builtin(definition) => definition.complete(entrypoint, args, env),
            CommandKind::DirectoryModule(_)
            | CommandKind::ExecutableModule(_)
            | CommandKind::BuiltinModule { .. } => Ok(self.subcommands()?.completions_for(args)),
            CommandKind::Root(subcommands) => {
                let mut completions = subcommands.completions_for(args);
                completions
                    .values
                    .retain(|name| name != crate::constants::COMPLETE_COMMAND);
                Ok(completions)
            }
            CommandKind::Null => Ok(Completions::new(Vec::new(), Directive::NO_FILE_COMP)),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            CommandKind::Executable(executable) => match executable.flavor() {
                Flavor::Script => "script",
                Flavor::Binary => "executable",
            },
            CommandKind::DirectoryModule(_) => "directory-module",
            CommandKind::ExecutableModule(_) => "executable-module",
            CommandKind::Builtin(_) => "builtin",
            CommandKind::BuiltinModule { .. } => "builtin-module",
            CommandKind::Root(_) => "entrypoint",
            CommandKind::Null => "null",
        };
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("path", &self.path)
            .finish()
    }
}
