// src/cli/builtins/complete.rs

use crate::constants::{COMPLETE_COMMAND, COMPLETION_DEBUG_ENV_VAR};
use crate::core::builtin::BuiltinCommand;
use crate::core::entrypoint::Entrypoint;
use crate::core::errors::ExecError;
use crate::core::shellcomp::{self, Completions, Directive, UnmarshalError};
use crate::system::executor::Env;
use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};

pub fn command(program: &str) -> BuiltinCommand {
    BuiltinCommand::new(COMPLETE_COMMAND, exec).help(format!(t!("complete.help"), name = program))
}

/// Prints the completions for `args` in the shell protocol. Anything meant for
/// the user goes to stderr, which completion scripts ignore.
fn exec(entrypoint: &Entrypoint, args: &[String], env: &Env) -> Result<(), ExecError> {
    let completions = completions(entrypoint, args, env)?;

    print!("{}", shellcomp::marshal(&completions.values, completions.directive, false));
    io::stdout().flush()?;

    eprintln!(
        "{}",
        format!(t!("complete.ended"), directive = completions.directive)
    );
    Ok(())
}

/// Never fails on a misbehaving command: the error is reported and whatever
/// could be salvaged is returned, so the directive line is always printed.
fn completions(entrypoint: &Entrypoint, args: &[String], env: &Env) -> Result<Completions, ExecError> {
    match entrypoint.completions_for(args, env, true) {
        Ok(completions) => Ok(completions),
        Err(e) => {
            completion_error(&e.to_string())?;
            let partial = e
                .cause()
                .downcast_ref::<UnmarshalError>()
                .map(|unmarshal| unmarshal.completions.clone())
                .unwrap_or_default();
            Ok(Completions::new(partial, Directive::NO_FILE_COMP))
        }
    }
}

fn completion_error(message: &str) -> io::Result<()> {
    let line = format!(t!("complete.error"), message = message);
    completion_debug(&line)?;
    eprintln!("{}", line);
    Ok(())
}

/// Appends to the file completion scripts log to, when debugging is on.
fn completion_debug(line: &str) -> io::Result<()> {
    let Some(path) = env::var_os(COMPLETION_DEBUG_ENV_VAR).filter(|path| !path.is_empty()) else {
        return Ok(());
    };
    // A debug file that cannot be opened is not worth failing completion over.
    let Ok(mut file) = OpenOptions::new().append(true).create(true).open(path) else {
        return Ok(());
    };
    writeln!(file, "{}", line)
}
