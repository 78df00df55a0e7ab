// src/core/commands.rs

use crate::core::command::CommandRef;
use crate::core::errors::Error;
use crate::core::shellcomp::{Completions, Directive};
use std::sync::Arc;
use std::thread;

/// An ordered list of commands. Lookups are first-match-wins.
#[derive(Debug, Clone, Default)]
pub struct Commands(Vec<CommandRef>);

/// How far [`Commands::expand`] should descend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Levels of modules to replace with their children: -1 for all, 0 for none.
    pub depth: i32,
    /// Whether an expanded module is listed ahead of its children.
    pub include_modules: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            depth: -1,
            include_modules: true,
        }
    }
}

impl ExpandOptions {
    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn without_expanded_modules(mut self) -> Self {
        self.include_modules = false;
        self
    }
}

impl Commands {
    /// The first command called `name`.
    pub fn find(&self, name: &str) -> Option<&CommandRef> {
        self.0.iter().find(|command| command.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommandRef> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[CommandRef] {
        &self.0
    }

    /// Replaces modules with their subcommands down to `options.depth`.
    ///
    /// Siblings are expanded in parallel, but the result always follows the
    /// input order. Modules that fail to list their children contribute an
    /// error and, if requested, themselves.
    pub fn expand(&self, options: ExpandOptions) -> (Self, Vec<Error>) {
        expand(&self.0, options.depth, options.include_modules)
    }

    /// Every command in the tree below this list, modules included.
    pub fn flatten(&self) -> (Self, Vec<Error>) {
        self.expand(ExpandOptions::default())
    }

    /// Names of the commands starting with the first argument.
    pub fn completions_for(&self, args: &[String]) -> Completions {
        let values = match args.first() {
            Some(prefix) => self
                .0
                .iter()
                .map(|command| command.name())
                .filter(|name| name.starts_with(prefix.as_str()))
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };
        Completions::new(values, Directive::NO_FILE_COMP)
    }
}

type Expansion = (Vec<CommandRef>, Vec<Error>);

fn expand(commands: &[CommandRef], depth: i32, include_modules: bool) -> (Commands, Vec<Error>) {
    let mut results: Vec<Expansion> = commands.iter().map(|_| Expansion::default()).collect();

    // Listing a module may block on a subprocess, so every module gets its own
    // thread rather than a slot in a CPU-sized pool. Each thread writes only
    // its own slot so order is kept.
    thread::scope(|scope| {
        for (command, slot) in commands.iter().zip(results.iter_mut()) {
            if command.is_module() && depth != 0 {
                scope.spawn(move || *slot = expand_module(command, depth, include_modules));
            } else {
                slot.0.push(Arc::clone(command));
            }
        }
    });

    let mut all = Vec::new();
    let mut errors = Vec::new();
    for (expanded, errs) in results {
        all.extend(expanded);
        errors.extend(errs);
    }
    (Commands(all), errors)
}

fn expand_module(module: &CommandRef, depth: i32, include_modules: bool) -> Expansion {
    let mut commands = Vec::new();
    let mut errors = Vec::new();

    if include_modules {
        commands.push(Arc::clone(module));
    }

    match module.subcommands() {
        Ok(subcommands) => {
            let next_depth = if depth > 0 { depth - 1 } else { depth };
            let (expanded, errs) = expand(&subcommands.0, next_depth, include_modules);
            commands.extend(expanded.0);
            errors.extend(errs);
        }
        Err(e) => errors.push(Error::from(e)),
    }

    (commands, errors)
}

impl From<Vec<CommandRef>> for Commands {
    fn from(commands: Vec<CommandRef>) -> Self {
        Self(commands)
    }
}

impl FromIterator<CommandRef> for Commands {
    fn from_iter<I: IntoIterator<Item = CommandRef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Commands {
    type Item = CommandRef;
    type IntoIter = std::vec::IntoIter<CommandRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Commands {
    type Item = &'a CommandRef;
    type IntoIter = std::slice::Iter<'a, CommandRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
