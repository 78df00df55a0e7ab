// src/core/identify.rs

use crate::constants::{COMPLETE_COMMAND, COMPLETE_FLAG, HELP_COMMAND, HELP_FLAG, SHORT_HELP_FLAG};
use crate::core::command::{Command, CommandRef};
use crate::core::entrypoint::Entrypoint;
use crate::core::errors::IdentifyError;
use log::trace;
use std::iter;
use std::sync::Arc;

impl Entrypoint {
    /// Finds the command named by the leading words of `args`.
    ///
    /// Returns the command and the arguments meant for it. Resolution stops at
    /// the first word starting with `-`, at a leaf, or at an unknown name, in
    /// which case a null command is returned and the observer is told, along
    /// with the closest matches. `a:b` is the same as `a b`.
    ///
    /// Two shorthands are rewritten: a leading `--complete` runs the `complete`
    /// built-in, and `--help`/`-h` right after a command runs `help <command>`.
    ///
    /// If a module along the way cannot list its subcommands, the error names
    /// that module and the arguments still to be consumed.
    pub fn identify(&self, args: &[String]) -> Result<(CommandRef, Vec<String>), IdentifyError> {
        if let Some((first, rest)) = args.split_first() {
            if first == COMPLETE_FLAG {
                let rewritten: Vec<String> = iter::once(COMPLETE_COMMAND.to_string())
                    .chain(rest.iter().cloned())
                    .collect();
                return self.identify(&rewritten);
            }
        }

        let (command, rest) = self.resolve(args)?;
        if command.is_null() {
            self.command_not_found(&command);
            return Ok((command, rest));
        }

        if let Some((first, tail)) = rest.split_first() {
            if first == HELP_FLAG || first == SHORT_HELP_FLAG {
                let rewritten: Vec<String> = iter::once(HELP_COMMAND.to_string())
                    .chain(command.args_relative_to(Some(&**self.root())))
                    .chain(tail.iter().cloned())
                    .collect();
                trace!("rewriting {:?} to {:?}", args, rewritten);
                return self.identify(&rewritten);
            }
        }

        Ok((command, rest))
    }

    /// Like [`identify`](Self::identify) but silent and without shorthands.
    pub fn resolve(&self, args: &[String]) -> Result<(CommandRef, Vec<String>), IdentifyError> {
        identify_in(self.root(), args)
    }

    fn command_not_found(&self, command: &CommandRef) {
        let typed = self.relative_usage(command);
        let suggestions = self.suggestions_for(&typed);
        self.observer().on_command_not_found(self, command, &suggestions);
    }
}

fn identify_in(
    module: &CommandRef,
    args: &[String],
) -> Result<(CommandRef, Vec<String>), IdentifyError> {
    let Some((first, rest)) = args.split_first() else {
        return Ok((Arc::clone(module), Vec::new()));
    };
    if first.starts_with('-') {
        return Ok((Arc::clone(module), args.to_vec()));
    }

    if first.contains(':') {
        let expanded: Vec<String> = first
            .split(':')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .chain(rest.iter().cloned())
            .collect();
        return identify_in(module, &expanded);
    }

    let subcommands = module.subcommands().map_err(|error| IdentifyError {
        command: Arc::clone(module),
        args: args.to_vec(),
        error,
    })?;
    let Some(command) = subcommands.find(first) else {
        return Ok((Command::null(first.as_str(), &Arc::downgrade(module)), rest.to_vec()));
    };

    if command.is_module() {
        let children = command.subcommands().map_err(|error| IdentifyError {
            command: Arc::clone(command),
            args: rest.to_vec(),
            error,
        })?;
        if !children.is_empty() {
            return identify_in(command, rest);
        }
    }

    Ok((Arc::clone(command), rest.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builtin::{BuiltinCommand, BuiltinModule};

    fn leaf(name: &str, summary: &str) -> BuiltinCommand {
        BuiltinCommand::new(name, |_, _, _| Ok(())).summary(summary)
    }

    // go
    // ├── help, which, complete
    // ├── a ("first")
    // ├── a ("second")
    // ├── b
    // │   └── c
    // ├── empty (no children)
    // └── echoargs
    fn entrypoint() -> Entrypoint {
        Entrypoint::builder()
            .name("go")
            .path("/usr/local/bin/go")
            .append_command(leaf("a", "first"))
            .append_command(leaf("a", "second"))
            .append_command(BuiltinModule::new("b", "b module").command(leaf("c", "c leaf")))
            .append_command(BuiltinModule::new("empty", "nothing inside"))
            .append_command(leaf("echoargs", "echo"))
            .build()
            .unwrap()
    }

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_first_match_wins() {
        let entrypoint = entrypoint();
        for _ in 0..5 {
            let (command, rest) = entrypoint.identify(&args(&["a"])).unwrap();
            assert_eq!(command.summary().unwrap(), "first");
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn test_colon_equivalence() {
        let entrypoint = entrypoint();
        for (spaced, coloned) in [
            (args(&["b", "c", "x"]), args(&["b:c", "x"])),
            (args(&["b", "c"]), args(&["b:c:"])),
            (args(&["b", "z"]), args(&["b::z"])),
        ] {
            let (left, left_rest) = entrypoint.resolve(&spaced).unwrap();
            let (right, right_rest) = entrypoint.resolve(&coloned).unwrap();
            assert_eq!(left.usage(), right.usage());
            assert_eq!(left.is_null(), right.is_null());
            assert_eq!(left_rest, right_rest);
        }
    }

    #[test]
    fn test_stops_at_flags_and_leaves() {
        let entrypoint = entrypoint();

        let (command, rest) = entrypoint.identify(&args(&["b", "-x", "c"])).unwrap();
        assert_eq!(command.usage(), "go b");
        assert_eq!(rest, args(&["-x", "c"]));

        let (command, rest) = entrypoint.identify(&args(&["b", "c", "d", "e"])).unwrap();
        assert_eq!(command.usage(), "go b c");
        assert_eq!(rest, args(&["d", "e"]));

        let (command, rest) = entrypoint.identify(&[]).unwrap();
        assert!(Arc::ptr_eq(&command, entrypoint.root()));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_empty_module_is_terminal() {
        let entrypoint = entrypoint();
        let (command, rest) = entrypoint.identify(&args(&["empty", "x"])).unwrap();
        assert_eq!(command.usage(), "go empty");
        assert!(!command.is_null());
        assert_eq!(rest, args(&["x"]));
    }

    #[test]
    fn test_unknown_name_yields_null_command() {
        let entrypoint = entrypoint();
        let (command, rest) = entrypoint.resolve(&args(&["b", "nope", "x"])).unwrap();
        assert!(command.is_null());
        assert_eq!(command.usage(), "go b nope");
        assert_eq!(rest, args(&["x"]));
    }

    #[test]
    fn test_help_flag_is_rewritten() {
        let entrypoint = entrypoint();
        let (command, rest) = entrypoint.identify(&args(&["b", "c", "--help", "more"])).unwrap();
        let (expected, expected_rest) = entrypoint.identify(&args(&["help", "b", "c", "more"])).unwrap();
        assert!(Arc::ptr_eq(&command, &expected));
        assert_eq!(command.name(), "help");
        assert_eq!(rest, expected_rest);
        assert_eq!(rest, args(&["b", "c", "more"]));

        let (command, rest) = entrypoint.identify(&args(&["-h"])).unwrap();
        assert_eq!(command.name(), "help");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_no_rewrite_after_separator() {
        let entrypoint = entrypoint();
        let (command, rest) = entrypoint.identify(&args(&["echoargs", "--", "--help"])).unwrap();
        assert_eq!(command.name(), "echoargs");
        assert_eq!(rest, args(&["--", "--help"]));
    }

    #[test]
    fn test_complete_flag_is_rewritten() {
        let entrypoint = entrypoint();
        let (command, rest) = entrypoint.identify(&args(&["--complete", "b", "c"])).unwrap();
        assert_eq!(command.name(), "complete");
        assert_eq!(rest, args(&["b", "c"]));
    }
}
