// src/core/shellcomp.rs
//
// The completion protocol shared by Bash and Zsh completion scripts: a command
// invoked with `--complete -- <args>` prints one completion per line and then a
// final `:<directive>` line.

use bitflags::bitflags;
use std::fmt;
use std::num::ParseIntError;
use thiserror::Error;

bitflags! {
    /// Tells the shell how to treat the completions it was given.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Directive: u32 {
        /// An error occurred and completions should be ignored.
        const ERROR = 1;
        /// Do not add a space after the completion.
        const NO_SPACE = 1 << 1;
        /// Do not fall back to file completion when nothing matched.
        const NO_FILE_COMP = 1 << 2;
        /// Use the completions as file extension filters.
        const FILTER_FILE_EXT = 1 << 3;
        /// Complete directory names only.
        const FILTER_DIRS = 1 << 4;
    }
}

impl Directive {
    /// Let the shell do whatever it does by default.
    pub const DEFAULT: Self = Self::empty();

    const NAMES: [(Self, &'static str); 5] = [
        (Self::ERROR, "ShellCompDirectiveError"),
        (Self::NO_SPACE, "ShellCompDirectiveNoSpace"),
        (Self::NO_FILE_COMP, "ShellCompDirectiveNoFileComp"),
        (Self::FILTER_FILE_EXT, "ShellCompDirectiveFilterFileExt"),
        (Self::FILTER_DIRS, "ShellCompDirectiveFilterDirs"),
    ];
}

impl Default for Directive {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !Self::all().contains(*self) {
            return write!(f, "ERROR: unexpected ShellCompDirective value: {}", self.bits());
        }
        if self.is_empty() {
            return f.write_str("ShellCompDirectiveDefault");
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(", "))
    }
}

/// A list of completions together with the directive for the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completions {
    pub values: Vec<String>,
    pub directive: Directive,
}

impl Completions {
    pub fn new(values: Vec<String>, directive: Directive) -> Self {
        Self { values, directive }
    }
}

#[derive(Error, Debug)]
#[error("invalid completion directive '{directive}': {source}")]
pub struct UnmarshalError {
    pub directive: String,
    /// Whatever completions preceded the bad directive line.
    pub completions: Vec<String>,
    #[source]
    pub source: ParseIntError,
}

/// Renders completions in the protocol's wire format.
///
/// Only the first line of each completion is kept and it is trimmed. With
/// `no_descriptions`, anything after a tab is dropped as well.
pub fn marshal(completions: &[String], directive: Directive, no_descriptions: bool) -> String {
    let mut out = String::new();
    for completion in completions {
        let mut completion = completion.as_str();
        if no_descriptions {
            completion = completion.split('\t').next().unwrap_or_default();
        }
        completion = completion.split('\n').next().unwrap_or_default();
        out.push_str(completion.trim());
        out.push('\n');
    }
    out.push_str(&format!(":{}\n", directive.bits()));
    out
}

/// Parses a command's completion output. The last line must be `:<directive>`.
pub fn unmarshal(output: &str) -> Result<Completions, UnmarshalError> {
    let output = output.strip_suffix('\n').unwrap_or(output);
    let mut lines: Vec<String> = output.split('\n').map(str::to_string).collect();
    let last = lines.pop().unwrap_or_default();
    let directive = last.strip_prefix(':').unwrap_or(&last);

    match directive.parse::<u32>() {
        Ok(bits) => Ok(Completions::new(lines, Directive::from_bits_retain(bits))),
        Err(source) => Err(UnmarshalError {
            directive: directive.to_string(),
            completions: lines,
            source,
        }),
    }
}
