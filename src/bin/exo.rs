// src/bin/exo.rs

use anyhow::{Context, Result};
use colored::Colorize;
use exoskeleton::cli::{Cli, error_message};
use exoskeleton::constants::EXIT_NOT_OK;
use exoskeleton::core::config::Config;
use exoskeleton::system::executor::Env;
use exoskeleton::ExecError;
use std::env;
use std::process;

/// Loads the configuration, builds the command tree and runs whatever the
/// arguments name. The process exits with the command's own status.
fn main() {
    env_logger::init();

    match run_cli() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{}", error_message(&format!("{:#}", e)).red());
            process::exit(EXIT_NOT_OK);
        }
    }
}

fn run_cli() -> Result<i32> {
    let (cli, args) = Cli::parse_with_rest(env::args().collect()).unwrap_or_else(|e| e.exit());
    log::debug!("CLI args parsed: {:?}, passing through {:?}", cli, args);

    let config = Config::discover(cli.config.as_deref()).context("Failed to load configuration")?;
    let entrypoint = config
        .into_builder()?
        .build()
        .context("Failed to build the command tree")?;

    let env: Env = env::vars().collect();
    match entrypoint.run(&args, &env) {
        Ok(()) => Ok(0),
        // The command already spoke for itself.
        Err(ExecError::Exited(code)) => Ok(code),
        // The observer already printed the notice and suggestions.
        Err(e @ ExecError::UnknownSubcommand(_)) => Ok(e.exit_code()),
        Err(e) => {
            eprintln!("{}", error_message(&e).red());
            Ok(e.exit_code())
        }
    }
}
