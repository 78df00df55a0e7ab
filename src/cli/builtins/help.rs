// src/cli/builtins/help.rs

use super::complete_commands;
use crate::constants::HELP_COMMAND;
use crate::core::builtin::BuiltinCommand;
use crate::core::command::CommandRef;
use crate::core::entrypoint::Entrypoint;
use crate::core::errors::{CommandError, ExecError};
use crate::core::menu::print_help;
use crate::system::executor::Env;

pub fn command(program: &str) -> BuiltinCommand {
    BuiltinCommand::new(HELP_COMMAND, exec)
        .help(format!(t!("help.help"), name = program))
        .complete_with(complete_commands)
}

fn exec(entrypoint: &Entrypoint, args: &[String], _env: &Env) -> Result<(), ExecError> {
    let (command, rest) = entrypoint.identify(args)?;
    if command.is_null() {
        return Err(ExecError::UnknownSubcommand(command.usage()));
    }
    print_help(&help_for(entrypoint, &command, &rest)?);
    Ok(())
}

/// A module's menu, or a leaf's own help text.
pub fn help_for(
    entrypoint: &Entrypoint,
    command: &CommandRef,
    args: &[String],
) -> Result<String, CommandError> {
    if command.is_module() {
        entrypoint.module_help(command, args)
    } else {
        command.help()
    }
}
