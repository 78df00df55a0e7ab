// src/cli/builtins/mod.rs

//! The commands every entrypoint carries unless told otherwise.

use crate::constants::END_OF_OPTIONS;
use crate::core::builtin::Builtin;
use crate::core::entrypoint::Entrypoint;
use crate::core::errors::CommandError;
use crate::core::shellcomp::{Completions, Directive};
use crate::system::executor::Env;

pub mod complete;
pub mod help;
pub mod which;

/// `help`, `which` and `complete`, documented for `program`.
pub fn defaults(program: &str) -> Vec<Builtin> {
    vec![
        help::command(program).into(),
        which::command(program).into(),
        complete::command(program).into(),
    ]
}

/// Completes command names, for built-ins whose arguments name a command.
pub fn complete_commands(
    entrypoint: &Entrypoint,
    args: &[String],
    env: &Env,
) -> Result<Completions, CommandError> {
    entrypoint.completions_for(args, env, false)
}

/// Lets the shell fall back to completing file names.
pub fn complete_files(
    _entrypoint: &Entrypoint,
    _args: &[String],
    _env: &Env,
) -> Result<Completions, CommandError> {
    Ok(Completions::new(Vec::new(), Directive::DEFAULT))
}

/// Whether `long` or `short` appears before any `--`.
fn has_flag(args: &[String], long: &str, short: &str) -> bool {
    args.iter()
        .take_while(|arg| arg.as_str() != END_OF_OPTIONS)
        .any(|arg| arg == long || arg == short)
}

/// `args` without the occurrences of `long` and `short` that precede any `--`.
fn strip_flag(args: &[String], long: &str, short: &str) -> Vec<String> {
    let mut options = true;
    args.iter()
        .filter(|arg| {
            if arg.as_str() == END_OF_OPTIONS {
                options = false;
            }
            !(options && (arg.as_str() == long || arg.as_str() == short))
        })
        .cloned()
        .collect()
}
