// src/core/suggestions.rs

use crate::constants::SUGGESTIONS_MAX_DISTANCE;
use crate::core::command::CommandRef;
use crate::core::entrypoint::Entrypoint;
use std::collections::HashSet;

impl Entrypoint {
    /// Commands that look like what the user typed, closest first.
    ///
    /// `typed` is a usage relative to the entrypoint (`mod tdy` or `mod:tdy`).
    /// A command qualifies when its usage is within a small edit distance, starts
    /// with `typed`, or ends with it as the last word, all ignoring case.
    pub fn suggestions_for(&self, typed: &str) -> Vec<CommandRef> {
        let typed = typed.replace(':', " ").to_lowercase();
        let namespaced = format!(" {}", typed);
        let (all, _) = self.subcommands().flatten();

        let mut seen = HashSet::new();
        let mut ranked: Vec<(usize, CommandRef)> = Vec::new();
        for command in all {
            let usage = self.relative_usage(&command);
            if seen.contains(&usage) {
                continue;
            }

            let lowered = usage.to_lowercase();
            let distance = levenshtein(&typed, &lowered);
            if distance <= SUGGESTIONS_MAX_DISTANCE
                || lowered.starts_with(&typed)
                || lowered.ends_with(&namespaced)
            {
                seen.insert(usage);
                ranked.push((distance, command));
            }
        }

        // Stable: equally distant commands keep their tree order.
        ranked.sort_by_key(|(distance, _)| *distance);
        ranked.into_iter().map(|(_, command)| command).collect()
    }
}

/// The number of single-character edits turning `a` into `b`.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = Vec::with_capacity(b.len() + 1);

    for (i, ca) in a.chars().enumerate() {
        current.clear();
        current.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous.get(j).copied().unwrap_or_default() + usize::from(ca != *cb);
            let deletion = previous.get(j + 1).copied().unwrap_or_default() + 1;
            let insertion = current.get(j).copied().unwrap_or_default() + 1;
            current.push(substitution.min(deletion).min(insertion));
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous.last().copied().unwrap_or_default()
}
