// src/cli/mod.rs

use clap::Parser;
use std::fmt;
use std::path::PathBuf;

pub mod builtins;

/// exo: runs the commands discovered in the configured search paths.
///
/// Only the options in front of the first command word belong to `exo`;
/// everything from there on is handed to the command tree untouched.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, disable_help_flag = true, disable_help_subcommand = true)]
pub struct Cli {
    /// Configuration file. Defaults to `$EXO_CONFIG`, then `<config dir>/exo/exo.toml`.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Splits the process arguments (program name first) into the frontend's
    /// own options and the words meant for the command tree.
    pub fn parse_with_rest(args: Vec<String>) -> Result<(Self, Vec<String>), clap::Error> {
        let mut iter = args.into_iter();
        let mut own: Vec<String> = iter.next().into_iter().collect();
        let mut rest = Vec::new();

        while let Some(arg) = iter.next() {
            if arg == "--config" {
                own.push(arg);
                own.extend(iter.next());
            } else if arg.starts_with("--config=") {
                own.push(arg);
            } else {
                rest.push(arg);
                rest.extend(iter.by_ref());
            }
        }

        Ok((Self::try_parse_from(own)?, rest))
    }
}

/// The line the frontend prints for an error nothing else reported.
pub fn error_message(error: &dyn fmt::Display) -> String {
    format!(t!("cli.error"), error = error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_leading_config_is_taken() {
        let (cli, rest) =
            Cli::parse_with_rest(args(&["exo", "--config", "/etc/exo.toml", "deploy", "--help"])).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/exo.toml")));
        assert_eq!(rest, args(&["deploy", "--help"]));

        let (cli, rest) = Cli::parse_with_rest(args(&["exo", "--config=/tmp/x.toml"])).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_everything_after_the_first_word_passes_through() {
        let (cli, rest) =
            Cli::parse_with_rest(args(&["exo", "--complete", "--", "--config", "x"])).unwrap();
        assert_eq!(cli.config, None);
        assert_eq!(rest, args(&["--complete", "--", "--config", "x"]));
    }

    #[test]
    fn test_missing_config_value_is_an_error() {
        assert!(Cli::parse_with_rest(args(&["exo", "--config"])).is_err());
    }
}
