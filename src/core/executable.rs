// src/core/executable.rs

use crate::constants::{COMPLETE_FLAG, HELP_FLAG, SUMMARY_CACHE_KEY, SUMMARY_FLAG};
use crate::core::command::CommandRef;
use crate::core::discovery::DiscoveryContext;
use crate::core::errors::{CommandError, CommandErrorKind, ExecError};
use crate::core::shellcomp::{self, Completions};
use crate::system::executor::{Env, Invocation};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

const SHEBANG: &[u8; 2] = b"#!";
const SUMMARY_MARKER: &str = "# SUMMARY:";
const HELP_MARKER: &str = "# HELP:";
const USAGE_MARKER: &str = "# USAGE:";

/// How a leaf documents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// A `#!` script: summary and help come from magic comments.
    Script,
    /// Anything else: summary and help come from running it with a flag.
    Binary,
}

/// A leaf backed by an executable file.
///
/// `args` is non-empty for entries of a protocol-described module: they are
/// all invoked through the module's file, e.g. `go mod tidy` runs `go` with
/// `["mod", "tidy"]` in front of the user's arguments.
#[derive(Debug)]
pub(crate) struct Executable {
    args: Vec<String>,
    summary: Option<String>,
    flavor: Flavor,
    context: DiscoveryContext,
}

impl Executable {
    pub(crate) fn new(
        args: Vec<String>,
        summary: Option<String>,
        flavor: Flavor,
        context: DiscoveryContext,
    ) -> Self {
        Self {
            args,
            summary,
            flavor,
            context,
        }
    }

    pub(crate) fn flavor(&self) -> Flavor {
        self.flavor
    }

    fn invocation(&self, path: &Path, extra: impl IntoIterator<Item = String>) -> Invocation {
        let args = self.args.iter().cloned().chain(extra).collect();
        Invocation::new(path, args)
    }

    pub(crate) fn summary(&self, command: &CommandRef) -> Result<String, CommandError> {
        // An empty summary from a descriptor counts as missing.
        if let Some(summary) = self.summary.as_ref().filter(|summary| !summary.is_empty()) {
            return Ok(summary.clone());
        }

        let key = cache_key(SUMMARY_CACHE_KEY, &self.args);
        self.context.cache().fetch(command.path(), &key, &|| match self.flavor {
            Flavor::Script => {
                let summary = read_magic_comments(command, CommandErrorKind::Summary, summary_from_magic_comments)?;
                if summary.is_empty() {
                    self.message_from_execution(command, SUMMARY_FLAG, CommandErrorKind::Summary)
                } else {
                    Ok(summary)
                }
            }
            Flavor::Binary => {
                self.message_from_execution(command, SUMMARY_FLAG, CommandErrorKind::Summary)
            }
        })
    }

    pub(crate) fn help(&self, command: &CommandRef) -> Result<String, CommandError> {
        if self.flavor == Flavor::Script {
            let help = read_magic_comments(command, CommandErrorKind::Help, help_from_magic_comments)?;
            if !help.is_empty() {
                return Ok(help);
            }
        }
        self.message_from_execution(command, HELP_FLAG, CommandErrorKind::Help)
    }

    fn message_from_execution(
        &self,
        command: &CommandRef,
        flag: &str,
        kind: CommandErrorKind,
    ) -> Result<String, CommandError> {
        let invocation = self.invocation(command.path(), [flag.to_string()]);
        let output = self
            .context
            .executor()
            .capture_output(&invocation)
            .map_err(|e| CommandError::from_execution(kind, command, e))?;
        Ok(output.trim_end_matches('\n').to_string())
    }

    /// Asks the executable itself: `<path> <args…> --complete -- <user args…>`.
    pub(crate) fn complete(
        &self,
        command: &CommandRef,
        args: &[String],
        env: &Env,
    ) -> Result<Completions, CommandError> {
        let extra = [COMPLETE_FLAG.to_string(), "--".to_string()]
            .into_iter()
            .chain(args.iter().cloned());
        let invocation = self.invocation(command.path(), extra).with_env(env.clone());
        let output = self
            .context
            .executor()
            .capture_output(&invocation)
            .map_err(|e| CommandError::from_execution(CommandErrorKind::Completion, command, e))?;

        shellcomp::unmarshal(&output).map_err(|e| {
            let message = format!("complete('{}'): {}", command.usage(), e);
            CommandError::new(CommandErrorKind::Completion, command, message, e)
        })
    }

    pub(crate) fn exec(&self, command: &CommandRef, args: &[String], env: &Env) -> Result<(), ExecError> {
        let invocation = self
            .invocation(command.path(), args.iter().cloned())
            .with_env(env.clone());
        match self.context.executor().run(&invocation)? {
            0 => Ok(()),
            code => Err(ExecError::Exited(code)),
        }
    }
}

/// The operation key for `args`-prefixed nodes includes the prefix, so
/// siblings sharing one backing file get separate cache entries.
pub(crate) fn cache_key(operation: &str, args: &[String]) -> String {
    if args.is_empty() {
        operation.to_string()
    } else {
        format!("{} {}", operation, args.join(" "))
    }
}

/// True when the file starts with `#!`. Files shorter than two bytes are not scripts.
pub(crate) fn is_script(path: &Path) -> io::Result<bool> {
    let mut buffer = [0u8; 2];
    match File::open(path)?.read_exact(&mut buffer) {
        Ok(()) => Ok(&buffer == SHEBANG),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Opens the command's file and runs one of the magic comment parsers over it.
pub(crate) fn read_magic_comments(
    command: &CommandRef,
    kind: CommandErrorKind,
    parse: fn(&mut dyn BufRead) -> io::Result<String>,
) -> Result<String, CommandError> {
    let operation = match kind {
        CommandErrorKind::Help => "help",
        _ => "summary",
    };
    File::open(command.path())
        .and_then(|file| parse(&mut BufReader::new(file)))
        .map_err(|e| {
            let message = format!("{}('{}'): {}", operation, command.usage(), e);
            CommandError::new(kind, command, message, e)
        })
}

/// Lines of the reader, each keeping its trailing newline if it had one.
fn lines_with_endings(reader: &mut dyn BufRead) -> impl Iterator<Item = io::Result<String>> + '_ {
    std::iter::from_fn(move || {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(Ok(line)),
            Err(e) => Some(Err(e)),
        }
    })
}

fn strip_one_space(text: &str) -> &str {
    text.strip_prefix(' ').unwrap_or(text)
}

/// Extracts the text of the first `# SUMMARY: <text>` line, or "" if there is none.
pub(crate) fn summary_from_magic_comments(reader: &mut dyn BufRead) -> io::Result<String> {
    for line in lines_with_endings(reader) {
        let line = line?;
        if let Some(rest) = line.strip_prefix(SUMMARY_MARKER) {
            return Ok(strip_one_space(rest).trim_end_matches('\n').to_string());
        }
    }
    Ok(String::new())
}

/// Collects the `# HELP:` block (every following `#` line) and renders any
/// `# USAGE:` line as a `USAGE` section.
pub(crate) fn help_from_magic_comments(reader: &mut dyn BufRead) -> io::Result<String> {
    let mut help = String::new();
    let mut in_help_text = false;

    for line in lines_with_endings(reader) {
        let line = line?;

        if let Some(rest) = line.strip_prefix(USAGE_MARKER) {
            help.push_str("USAGE\n   ");
            help.push_str(strip_one_space(rest).trim_end_matches('\n'));
            help.push_str("\n\n");
        }

        if in_help_text {
            if line.starts_with('#') {
                match line.get(2..) {
                    Some(text) if !text.is_empty() => help.push_str(text),
                    _ => help.push('\n'),
                }
            } else {
                in_help_text = false;
            }
        }

        if let Some(rest) = line.strip_prefix(HELP_MARKER) {
            help.push_str(strip_one_space(rest));
            in_help_text = true;
        }
    }

    Ok(help.trim_end_matches('\n').to_string())
}
