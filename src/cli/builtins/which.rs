// src/cli/builtins/which.rs

use super::{complete_commands, has_flag, strip_flag};
use crate::constants::{FOLLOW_SYMLINKS_FLAG, SHORT_FOLLOW_SYMLINKS_FLAG, WHICH_COMMAND};
use crate::core::builtin::BuiltinCommand;
use crate::core::entrypoint::Entrypoint;
use crate::core::errors::ExecError;
use crate::system::executor::Env;
use std::path::PathBuf;

pub fn command(program: &str) -> BuiltinCommand {
    BuiltinCommand::new(WHICH_COMMAND, exec)
        .help(format!(t!("which.help"), name = program))
        .complete_with(complete_commands)
}

fn exec(entrypoint: &Entrypoint, args: &[String], _env: &Env) -> Result<(), ExecError> {
    let path = which(entrypoint, args)?;
    println!("{}", path.display());
    Ok(())
}

/// The file behind the command named by `args`. Built-ins answer with the
/// entrypoint's own executable.
pub fn which(entrypoint: &Entrypoint, args: &[String]) -> Result<PathBuf, ExecError> {
    let follow_symlinks = has_flag(args, FOLLOW_SYMLINKS_FLAG, SHORT_FOLLOW_SYMLINKS_FLAG);
    let words = strip_flag(args, FOLLOW_SYMLINKS_FLAG, SHORT_FOLLOW_SYMLINKS_FLAG);

    let (command, _) = entrypoint.identify(&words)?;
    if command.is_null() {
        return Err(ExecError::UnknownSubcommand(command.usage()));
    }

    let path = command.path();
    if !follow_symlinks {
        return Ok(path.to_path_buf());
    }
    dunce::canonicalize(path).map_err(|e| {
        eprintln!("{}", format!(t!("which.follow_error"), path = path.display()));
        ExecError::Io(e)
    })
}
