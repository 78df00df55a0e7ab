// src/core/entrypoint.rs

use crate::constants::{ALL_FLAG, DEFAULT_MODULE_METADATA_FILENAME, END_OF_OPTIONS, SHORT_ALL_FLAG};
use crate::core::builtin::Builtin;
use crate::core::cache::{Cache, NullCache};
use crate::core::command::{Command, CommandRef};
use crate::core::commands::Commands;
use crate::core::contracts::{Contract, default_contracts};
use crate::core::discovery::DiscoveryContext;
use crate::core::errors::{CommandError, Error, ExecError};
use crate::core::menu::{self, MenuHeadingFor, MenuOptions, MenuSummaryFor};
use crate::core::observer::{LoggingObserver, Observer};
use crate::core::shellcomp::{Completions, Directive};
use crate::system::executor::{Env, Executor, SystemExecutor};
use log::debug;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The root of a command tree: the program the user actually typed.
///
/// An entrypoint owns the tree and the collaborators used to build it. Its
/// children are the prepended built-ins, then every command discovered in the
/// search paths (in path order), then the appended built-ins.
pub struct Entrypoint {
    root: CommandRef,
    context: DiscoveryContext,
    menu_heading_for: Option<MenuHeadingFor>,
    menu_summary_for: Option<MenuSummaryFor>,
}

impl Entrypoint {
    pub fn builder() -> EntrypointBuilder {
        EntrypointBuilder::default()
    }

    /// The root command. Its `exec` prints the top-level menu.
    pub fn root(&self) -> &CommandRef {
        &self.root
    }

    pub fn name(&self) -> &str {
        self.root.name()
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn subcommands(&self) -> Commands {
        self.root.subcommands().unwrap_or_default()
    }

    /// The usage of `command` without the program name: `mod tidy` for `go mod tidy`.
    pub fn relative_usage(&self, command: &Command) -> String {
        command.usage_relative_to(Some(&*self.root))
    }

    pub fn observer(&self) -> &Arc<dyn Observer> {
        self.context.observer()
    }

    pub(crate) fn report(&self, error: &Error) {
        self.context.observer().on_error(error);
    }

    /// Identifies the command named by `args` and runs it with the rest.
    pub fn run(&self, args: &[String], env: &Env) -> Result<(), ExecError> {
        let (command, rest) = self.identify(args)?;
        debug!("running {:?} with {:?}", command, rest);
        command.exec(self, &rest, env)
    }

    /// Completions for the last of `args`.
    ///
    /// The words before it select the command. A module completes the names of
    /// its children; a leaf is only asked when `complete_args` is set, since
    /// built-ins like `help` complete command names rather than arguments.
    pub fn completions_for(
        &self,
        args: &[String],
        env: &Env,
        complete_args: bool,
    ) -> Result<Completions, CommandError> {
        let Some((last, typed)) = args.split_last() else {
            return Ok(Completions::new(Vec::new(), Directive::NO_FILE_COMP));
        };

        let (command, mut rest) = self.resolve(typed)?;
        if !command.is_module() && !complete_args {
            return Ok(Completions::new(Vec::new(), Directive::NO_FILE_COMP));
        }

        rest.push(last.clone());
        command.complete(self, &rest, env)
    }

    /// Renders the menu of `module`. `--all` (before any `--`) lists every
    /// nested command instead of just the first level.
    pub fn module_help(&self, module: &CommandRef, args: &[String]) -> Result<String, CommandError> {
        // Surface a failed discovery instead of printing an empty menu.
        module.subcommands()?;

        let all = args
            .iter()
            .take_while(|arg| arg.as_str() != END_OF_OPTIONS)
            .any(|arg| arg == ALL_FLAG || arg == SHORT_ALL_FLAG);

        let options = MenuOptions {
            depth: if all { -1 } else { 0 },
            heading_for: self.menu_heading_for.clone(),
            summary_for: self.menu_summary_for.clone(),
        };
        let (menu, errors) = menu::build_menu(module, &options);
        for error in &errors {
            self.report(error);
        }
        Ok(menu.to_string())
    }

    pub fn print_module_help(&self, module: &CommandRef, args: &[String]) -> Result<(), ExecError> {
        let help = self.module_help(module, args)?;
        menu::print_help(&help);
        Ok(())
    }
}

impl fmt::Debug for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entrypoint")
            .field("root", &self.root)
            .field("context", &self.context)
            .field("custom_menu_headings", &self.menu_heading_for.is_some())
            .field("custom_menu_summaries", &self.menu_summary_for.is_some())
            .finish()
    }
}

/// Configures and builds an [`Entrypoint`]. Every setting has a default, so
/// `Entrypoint::builder().build()` yields a working tree with no search paths.
pub struct EntrypointBuilder {
    name: Option<String>,
    path: Option<PathBuf>,
    paths: Vec<PathBuf>,
    max_depth: i32,
    module_metadata_filename: String,
    contracts: Option<Vec<Arc<dyn Contract>>>,
    cache: Arc<dyn Cache>,
    executor: Arc<dyn Executor>,
    observer: Arc<dyn Observer>,
    prepended: Vec<Builtin>,
    appended: Vec<Builtin>,
    default_commands: bool,
    help_texts: HashMap<String, String>,
    menu_heading_for: Option<MenuHeadingFor>,
    menu_summary_for: Option<MenuSummaryFor>,
}

impl Default for EntrypointBuilder {
    fn default() -> Self {
        Self {
            name: None,
            path: None,
            paths: Vec::new(),
            max_depth: -1,
            module_metadata_filename: DEFAULT_MODULE_METADATA_FILENAME.to_string(),
            contracts: None,
            cache: Arc::new(NullCache),
            executor: Arc::new(SystemExecutor),
            observer: Arc::new(LoggingObserver),
            prepended: Vec::new(),
            appended: Vec::new(),
            default_commands: true,
            help_texts: HashMap::new(),
            menu_heading_for: None,
            menu_summary_for: None,
        }
    }
}

impl EntrypointBuilder {
    /// Defaults to the file name of [`path`](Self::path).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Defaults to the current executable.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Directories to search for commands, in priority order.
    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// How many levels of modules to discover: -1 for all, 0 for none.
    pub fn max_depth(mut self, max_depth: i32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn module_metadata_filename(mut self, filename: impl Into<String>) -> Self {
        self.module_metadata_filename = filename.into();
        self
    }

    /// Replaces the built-in contracts entirely.
    pub fn contracts(mut self, contracts: Vec<Arc<dyn Contract>>) -> Self {
        self.contracts = Some(contracts);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Adds a built-in ahead of the default ones and everything discovered.
    pub fn prepend_command(mut self, command: impl Into<Builtin>) -> Self {
        self.prepended.push(command.into());
        self
    }

    /// Adds a built-in after everything discovered.
    pub fn append_command(mut self, command: impl Into<Builtin>) -> Self {
        self.appended.push(command.into());
        self
    }

    /// Leaves out `help`, `which` and `complete`.
    pub fn without_default_commands(mut self) -> Self {
        self.default_commands = false;
        self
    }

    /// Replaces the help text of the default `help`, `which` or `complete`.
    /// Names of other commands are ignored.
    pub fn help_text(mut self, command: impl Into<String>, text: impl Into<String>) -> Self {
        self.help_texts.insert(command.into(), text.into());
        self
    }

    /// Groups menu items under the heading returned for `(module, command)`.
    pub fn menu_heading_for(
        mut self,
        heading_for: impl Fn(&CommandRef, &CommandRef) -> String + Send + Sync + 'static,
    ) -> Self {
        self.menu_heading_for = Some(Arc::new(heading_for));
        self
    }

    /// Computes the summary menus show for each command, e.g. to read it from
    /// somewhere cheaper than the command itself.
    pub fn menu_summary_for(
        mut self,
        summary_for: impl Fn(&CommandRef) -> Result<String, CommandError> + Send + Sync + 'static,
    ) -> Self {
        self.menu_summary_for = Some(Arc::new(summary_for));
        self
    }

    /// Builds the tree. The top level is discovered right away; deeper levels
    /// are discovered on first use. Discovery errors go to the observer.
    pub fn build(self) -> io::Result<Entrypoint> {
        let path = match self.path {
            Some(path) => path,
            None => env::current_exe()?,
        };
        let name = self.name.unwrap_or_else(|| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        let contracts = self
            .contracts
            .unwrap_or_else(|| default_contracts(&self.module_metadata_filename));
        let context = DiscoveryContext::new(
            self.max_depth,
            contracts,
            self.cache,
            self.executor,
            self.observer,
        );

        let mut leading = self.prepended;
        if self.default_commands {
            let help_texts = &self.help_texts;
            leading.extend(crate::cli::builtins::defaults(&name).into_iter().map(
                |builtin| match builtin {
                    Builtin::Command(command) => match help_texts.get(&command.name) {
                        Some(text) => Builtin::Command(command.help(text.clone())),
                        None => Builtin::Command(command),
                    },
                    module => module,
                },
            ));
        }
        let trailing = self.appended;
        let paths = self.paths;

        let root = Command::root(&name, &path, |weak| {
            let mut commands: Vec<CommandRef> = leading
                .iter()
                .map(|builtin| builtin.materialize(&path, weak))
                .collect();

            let (discovered, errors) = context.discover_all(&paths, weak);
            for error in &errors {
                context.observer().on_error(error);
            }
            commands.extend(discovered);

            commands.extend(trailing.iter().map(|builtin| builtin.materialize(&path, weak)));
            Commands::from(commands)
        });

        debug!(
            "built entrypoint '{}' with {} top-level commands",
            root.name(),
            root.subcommands().map(|commands| commands.len()).unwrap_or_default()
        );

        Ok(Entrypoint {
            root,
            context,
            menu_heading_for: self.menu_heading_for,
            menu_summary_for: self.menu_summary_for,
        })
    }
}

impl fmt::Debug for EntrypointBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntrypointBuilder")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("paths", &self.paths)
            .field("max_depth", &self.max_depth)
            .field("module_metadata_filename", &self.module_metadata_filename)
            .field("default_commands", &self.default_commands)
            .field("help_texts", &self.help_texts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builtin::{BuiltinCommand, BuiltinModule};
    use crate::testing::RecordingObserver;

    fn leaf(name: &str) -> BuiltinCommand {
        BuiltinCommand::new(name, |_, _, _| Ok(()))
    }

    fn names(entrypoint: &Entrypoint) -> Vec<String> {
        entrypoint
            .subcommands()
            .iter()
            .map(|command| command.name().to_string())
            .collect()
    }

    #[test]
    fn test_children_order() {
        let entrypoint = Entrypoint::builder()
            .name("tool")
            .path("/opt/tool")
            .prepend_command(leaf("first"))
            .prepend_command(leaf("second"))
            .append_command(leaf("last"))
            .build()
            .unwrap();

        assert_eq!(
            names(&entrypoint),
            vec!["first", "second", "help", "which", "complete", "last"]
        );
        assert_eq!(entrypoint.name(), "tool");
        assert_eq!(entrypoint.path(), Path::new("/opt/tool"));
        assert!(entrypoint.root().is_module());
    }

    #[test]
    fn test_name_defaults_to_file_name() {
        let entrypoint = Entrypoint::builder()
            .path("/usr/local/bin/deploy")
            .without_default_commands()
            .build()
            .unwrap();
        assert_eq!(entrypoint.name(), "deploy");
        assert!(entrypoint.subcommands().is_empty());
    }

    #[test]
    fn test_missing_search_path_is_reported() {
        let observer = Arc::new(RecordingObserver::default());
        let dir = tempfile::tempdir().unwrap();
        Entrypoint::builder()
            .name("tool")
            .path("/opt/tool")
            .paths([dir.path().join("missing")])
            .observer(observer.clone())
            .build()
            .unwrap();

        assert_eq!(observer.errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_completions_for() {
        let entrypoint = Entrypoint::builder()
            .name("go")
            .path("/usr/local/bin/go")
            .append_command(leaf("build"))
            .append_command(
                BuiltinModule::new("mod", "module maintenance")
                    .command(leaf("tidy"))
                    .command(leaf("vendor")),
            )
            .append_command(leaf("run").complete_with(|_, args, _| {
                Ok(Completions::new(args.to_vec(), Directive::DEFAULT))
            }))
            .build()
            .unwrap();
        let env = Env::new();
        let args = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<Vec<_>>();

        let top = entrypoint.completions_for(&args(&["c"]), &env, true).unwrap();
        assert!(top.values.is_empty(), "complete is hidden: {:?}", top.values);

        let nested = entrypoint.completions_for(&args(&["mod", "t"]), &env, true).unwrap();
        assert_eq!(nested.values, vec!["tidy"]);

        let colon = entrypoint.completions_for(&args(&["mod:v"]), &env, true).unwrap();
        assert!(colon.values.is_empty());

        let leaf_args = entrypoint.completions_for(&args(&["run", "x", "y"]), &env, true).unwrap();
        assert_eq!(leaf_args.values, vec!["x", "y"]);

        let names_only = entrypoint.completions_for(&args(&["run", "x"]), &env, false).unwrap();
        assert!(names_only.values.is_empty());
        assert_eq!(names_only.directive, Directive::NO_FILE_COMP);

        let everything = entrypoint.completions_for(&args(&[""]), &env, true).unwrap();
        assert_eq!(everything.values, vec!["help", "which", "build", "mod", "run"]);

        let nothing = entrypoint.completions_for(&[], &env, true).unwrap();
        assert!(nothing.values.is_empty());
        assert_eq!(nothing.directive, Directive::NO_FILE_COMP);
    }

    #[test]
    fn test_module_help_lists_children() {
        let entrypoint = Entrypoint::builder()
            .name("go")
            .path("/usr/local/bin/go")
            .without_default_commands()
            .append_command(leaf("build").summary("compile packages"))
            .append_command(
                BuiltinModule::new("mod", "module maintenance")
                    .command(leaf("tidy").summary("add missing modules")),
            )
            .build()
            .unwrap();

        let help = entrypoint.module_help(entrypoint.root(), &[]).unwrap();
        assert!(help.contains("go <command> [<args>]"));
        assert!(help.contains("build"));
        assert!(help.contains("mod:"));
        assert!(!help.contains("add missing modules"));

        let all = entrypoint
            .module_help(entrypoint.root(), &["--all".to_string()])
            .unwrap();
        assert!(all.contains("mod tidy"));
        assert!(all.contains("add missing modules"));

        let after_separator = entrypoint
            .module_help(entrypoint.root(), &["--".to_string(), "-a".to_string()])
            .unwrap();
        assert!(!after_separator.contains("mod tidy"));
    }

    #[test]
    fn test_help_text_override() {
        let entrypoint = Entrypoint::builder()
            .name("tool")
            .path("/opt/tool")
            .help_text("which", "USAGE\n   tool which <command>")
            .help_text("nonexistent", "ignored")
            .build()
            .unwrap();

        let which = entrypoint.subcommands().find("which").unwrap().clone();
        assert_eq!(which.help().unwrap(), "USAGE\n   tool which <command>");
        let help = entrypoint.subcommands().find("help").unwrap().clone();
        assert!(help.help().unwrap().contains("tool"));
        assert_eq!(names(&entrypoint), vec!["help", "which", "complete"]);
    }

    #[test]
    fn test_menu_summary_for() {
        let entrypoint = Entrypoint::builder()
            .name("go")
            .path("/usr/local/bin/go")
            .without_default_commands()
            .append_command(leaf("build").summary("compile packages"))
            .append_command(leaf("vet").summary("report likely mistakes"))
            .menu_summary_for(|command| Ok(format!("({})", command.name())))
            .build()
            .unwrap();

        let help = entrypoint.module_help(entrypoint.root(), &[]).unwrap();
        assert!(help.contains("(build)"));
        assert!(help.contains("(vet)"));
        assert!(!help.contains("compile packages"));
    }

    #[test]
    fn test_run_unknown_command() {
        let observer = Arc::new(RecordingObserver::default());
        let entrypoint = Entrypoint::builder()
            .name("go")
            .path("/usr/local/bin/go")
            .observer(observer.clone())
            .append_command(leaf("build"))
            .build()
            .unwrap();

        let err = entrypoint
            .run(&["buidl".to_string()], &Env::new())
            .unwrap_err();
        assert!(matches!(err, ExecError::UnknownSubcommand(ref usage) if usage == "go buidl"));
        assert_eq!(err.exit_code(), crate::constants::EXIT_UNKNOWN_SUBCOMMAND);

        let not_found = observer.not_found.lock().unwrap();
        assert_eq!(not_found.len(), 1);
        assert_eq!(not_found[0].0, "buidl");
        assert_eq!(not_found[0].1, vec!["go build"]);
    }
}
