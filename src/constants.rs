// src/constants.rs

/// The file that marks a directory as a module; its magic comments describe the module.
pub const DEFAULT_MODULE_METADATA_FILENAME: &str = ".exoskeleton";

/// The extension (without the dot) that marks an executable as describing its own subtree.
pub const EXECUTABLE_MODULE_EXTENSION: &str = "exoskeleton";

/// Flag passed to protocol-described modules to obtain their JSON descriptor.
pub const DESCRIBE_COMMANDS_FLAG: &str = "--describe-commands";

/// Flag passed to plain executables to obtain their one-line summary.
pub const SUMMARY_FLAG: &str = "--summary";

/// Flag passed to plain executables to obtain their help text.
pub const HELP_FLAG: &str = "--help";
pub const SHORT_HELP_FLAG: &str = "-h";

/// Makes `help` list every nested command instead of one level.
pub const ALL_FLAG: &str = "--all";
pub const SHORT_ALL_FLAG: &str = "-a";

/// Makes `which` print the resolved target of a symlinked command.
pub const FOLLOW_SYMLINKS_FLAG: &str = "--follow-symlinks";
pub const SHORT_FOLLOW_SYMLINKS_FLAG: &str = "-s";

/// Separates options from positional arguments.
pub const END_OF_OPTIONS: &str = "--";

/// Flag that asks a command (or the entrypoint) for shell completions.
pub const COMPLETE_FLAG: &str = "--complete";

/// Cache operation key for summaries.
pub const SUMMARY_CACHE_KEY: &str = "summary";

/// Cache operation key for `--describe-commands` output.
pub const DESCRIBE_CACHE_KEY: &str = "describe-commands";

/// Names of the built-in commands every entrypoint carries.
pub const HELP_COMMAND: &str = "help";
pub const WHICH_COMMAND: &str = "which";
pub const COMPLETE_COMMAND: &str = "complete";

/// Maximum edit distance for a command to be offered as a suggestion.
pub const SUGGESTIONS_MAX_DISTANCE: usize = 2;

/// Heading used in menus when no heading function is configured.
pub const DEFAULT_MENU_HEADING: &str = "COMMANDS";

/// Name of the demo binary; also names its config and cache directories.
pub const DEFAULT_PROGRAM_NAME: &str = "exo";

/// The name of the configuration file read by the `exo` binary.
pub const CONFIG_FILENAME: &str = "exo.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "EXO_CONFIG";

/// File that receives completion errors when shell completion debugging is on.
pub const COMPLETION_DEBUG_ENV_VAR: &str = "BASH_COMP_DEBUG_FILE";

/// Exit codes, following the conventions of `sysexits`-style CLIs.
pub const EXIT_NOT_OK: i32 = 1;
pub const EXIT_USAGE_ERROR: i32 = 80;
pub const EXIT_UNKNOWN_SUBCOMMAND: i32 = 81;
pub const EXIT_INTERNAL_ERROR: i32 = 90;
