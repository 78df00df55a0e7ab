// src/core/menu.rs

use crate::constants::{DEFAULT_MENU_HEADING, HELP_COMMAND};
use crate::core::command::CommandRef;
use crate::core::commands::ExpandOptions;
use crate::core::errors::{CommandError, Error};
use colored::Colorize;
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

lazy_static! {
    // A line made only of capitals and spaces is a section heading.
    static ref HEADING_RE: Regex = Regex::new(r"(?m)^([A-Z ]+)$").unwrap();
}

/// Picks the menu section of `command` when listing `module`.
pub type MenuHeadingFor = Arc<dyn Fn(&CommandRef, &CommandRef) -> String + Send + Sync>;

/// Supplies the summary shown next to a command, in place of its own.
pub type MenuSummaryFor = Arc<dyn Fn(&CommandRef) -> Result<String, CommandError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct MenuOptions {
    /// Levels of nested modules to list: -1 for all, 0 for just the children.
    pub depth: i32,
    /// Defaults to a single `COMMANDS` section.
    pub heading_for: Option<MenuHeadingFor>,
    /// Defaults to [`Command::summary`](crate::core::command::Command::summary).
    pub summary_for: Option<MenuSummaryFor>,
}

impl fmt::Debug for MenuOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuOptions")
            .field("depth", &self.depth)
            .field("custom_headings", &self.heading_for.is_some())
            .field("custom_summaries", &self.summary_for.is_some())
            .finish()
    }
}

/// The data behind a module's help screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    /// `go mod <command> [<args>]`
    pub usage: String,
    /// `go help mod`
    pub help_usage: String,
    pub sections: Vec<MenuSection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSection {
    pub heading: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// Usage relative to the module; nested modules end in `:`.
    pub name: String,
    pub summary: String,
    pub heading: String,
    /// Width every name in the menu is padded to.
    pub width: usize,
}

/// Lists the subcommands of `module` grouped by heading.
///
/// Commands without a summary are left out. Summary failures are returned
/// alongside the menu rather than aborting it.
pub fn build_menu(module: &CommandRef, options: &MenuOptions) -> (Menu, Vec<Error>) {
    let subcommands = match module.subcommands() {
        Ok(subcommands) => subcommands,
        Err(e) => return (Menu::default(), vec![e.into()]),
    };

    let (commands, mut errors) = subcommands.expand(
        ExpandOptions::default()
            .with_depth(options.depth)
            .without_expanded_modules(),
    );

    let mut seen = HashSet::new();
    let mut named: Vec<(String, &CommandRef)> = Vec::new();
    for command in &commands {
        let mut name = command.usage_relative_to(Some(&**module));
        if command.is_module() {
            name.push(':');
        }
        if seen.insert(name.clone()) {
            named.push((name, command));
        }
    }

    // Summaries may spawn processes; fetch them side by side.
    let summaries: Vec<_> = named
        .par_iter()
        .map(|(_, command)| match &options.summary_for {
            Some(summary_for) => summary_for(command),
            None => command.summary(),
        })
        .collect();

    let mut items = Vec::new();
    for ((name, command), summary) in named.into_iter().zip(summaries) {
        match summary {
            Ok(summary) if summary.is_empty() => {}
            Ok(summary) => {
                let heading = match &options.heading_for {
                    Some(heading_for) => heading_for(module, command),
                    None => DEFAULT_MENU_HEADING.to_string(),
                };
                items.push(MenuItem {
                    name,
                    summary,
                    heading,
                    width: 0,
                });
            }
            Err(e) => errors.push(e.into()),
        }
    }

    let width = items
        .iter()
        .map(|item| item.name.chars().count())
        .max()
        .unwrap_or_default();

    let mut sections: Vec<MenuSection> = Vec::new();
    for mut item in items {
        item.width = width;
        match sections.iter_mut().find(|section| section.heading == item.heading) {
            Some(section) => section.items.push(item),
            None => sections.push(MenuSection {
                heading: item.heading.clone(),
                items: vec![item],
            }),
        }
    }
    for section in &mut sections {
        section.items.sort_by(|a, b| a.name.cmp(&b.name));
    }

    let menu = Menu {
        usage: format!("{} <command> [<args>]", module.usage()),
        help_usage: help_usage(module),
        sections,
    };
    (menu, errors)
}

fn help_usage(module: &CommandRef) -> String {
    let args = module.args_relative_to(None);
    match args.split_first() {
        Some((program, rest)) => std::iter::once(program.as_str())
            .chain(std::iter::once(HELP_COMMAND))
            .chain(rest.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        None => HELP_COMMAND.to_string(),
    }
}

impl fmt::Display for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n   {}", t!("menu.usage").bold(), self.usage)?;
        for section in &self.sections {
            write!(f, "\n\n{}", section.heading.bold())?;
            for item in &section.items {
                write!(
                    f,
                    "\n   {:<width$}  {}",
                    item.name,
                    item.summary,
                    width = item.width
                )?;
            }
        }
        let hint = format!("{} <command>", self.help_usage);
        write!(
            f,
            "\n\n{}",
            format!(t!("menu.run_help"), hint = hint.bright_cyan())
        )
    }
}

/// Emphasises the all-caps heading lines of a help text.
pub fn format_help(help: &str) -> String {
    HEADING_RE
        .replace_all(help, |caps: &Captures<'_>| {
            caps.get(1)
                .map(|heading| heading.as_str().bold().to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

pub fn print_help(help: &str) {
    println!("{}\n", format_help(help).trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builtin::{BuiltinCommand, BuiltinModule};
    use crate::core::entrypoint::Entrypoint;

    fn leaf(name: &str, summary: &str) -> BuiltinCommand {
        BuiltinCommand::new(name, |_, _, _| Ok(())).summary(summary)
    }

    fn entrypoint() -> Entrypoint {
        Entrypoint::builder()
            .name("go")
            .path("/usr/local/bin/go")
            .without_default_commands()
            .append_command(leaf("vet", "report likely mistakes"))
            .append_command(leaf("build", "compile packages"))
            .append_command(leaf("secret", ""))
            .append_command(
                BuiltinModule::new("mod", "module maintenance")
                    .command(leaf("tidy", "add missing modules"))
                    .command(leaf("init", "initialize a module")),
            )
            .append_command(leaf("vet", "shadowed duplicate"))
            .build()
            .unwrap()
    }

    fn names(menu: &Menu) -> Vec<Vec<&str>> {
        menu.sections
            .iter()
            .map(|section| section.items.iter().map(|item| item.name.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_top_level_menu() {
        let entrypoint = entrypoint();
        let (menu, errors) = build_menu(entrypoint.root(), &MenuOptions::default());
        assert!(errors.is_empty());
        assert_eq!(menu.usage, "go <command> [<args>]");
        assert_eq!(menu.help_usage, "go help");
        assert_eq!(names(&menu), vec![vec!["build", "mod:", "vet"]]);

        let section = &menu.sections[0];
        assert_eq!(section.heading, DEFAULT_MENU_HEADING);
        assert_eq!(section.items[2].summary, "report likely mistakes");
        assert!(section.items.iter().all(|item| item.width == 5));
    }

    #[test]
    fn test_all_levels_and_headings() {
        let entrypoint = entrypoint();
        let options = MenuOptions {
            depth: -1,
            heading_for: Some(Arc::new(|_: &CommandRef, command: &CommandRef| {
                match command.parent().map(|parent| parent.name().to_string()) {
                    Some(parent) if parent == "mod" => "MODULES".to_string(),
                    _ => "TOOLS".to_string(),
                }
            })),
            ..MenuOptions::default()
        };
        let (menu, _) = build_menu(entrypoint.root(), &options);

        let headings: Vec<&str> = menu.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["TOOLS", "MODULES"]);
        assert_eq!(
            names(&menu),
            vec![vec!["build", "vet"], vec!["mod init", "mod tidy"]]
        );
        assert!(menu.sections.iter().flat_map(|s| &s.items).all(|i| i.width == 8));
    }

    #[test]
    fn test_summary_override() {
        let entrypoint = entrypoint();
        let options = MenuOptions {
            summary_for: Some(Arc::new(|command: &CommandRef| -> Result<String, CommandError> {
                Ok(match command.name() {
                    "secret" => "now listed".to_string(),
                    "vet" => String::new(),
                    name => name.to_uppercase(),
                })
            })),
            ..MenuOptions::default()
        };
        let (menu, errors) = build_menu(entrypoint.root(), &options);
        assert!(errors.is_empty());
        assert_eq!(names(&menu), vec![vec!["build", "mod:", "secret"]]);
        let summaries: Vec<&str> = menu.sections[0]
            .items
            .iter()
            .map(|item| item.summary.as_str())
            .collect();
        assert_eq!(summaries, vec!["BUILD", "MOD", "now listed"]);
    }

    #[test]
    fn test_nested_module_menu() {
        let entrypoint = entrypoint();
        let module = entrypoint.subcommands().find("mod").unwrap().clone();
        let (menu, _) = build_menu(&module, &MenuOptions::default());
        assert_eq!(menu.usage, "go mod <command> [<args>]");
        assert_eq!(menu.help_usage, "go help mod");
        assert_eq!(names(&menu), vec![vec!["init", "tidy"]]);
    }

    #[test]
    fn test_render_contains_items() {
        let entrypoint = entrypoint();
        let (menu, _) = build_menu(entrypoint.root(), &MenuOptions::default());
        let rendered = menu.to_string();
        assert!(rendered.contains("go <command> [<args>]"));
        assert!(rendered.contains("   build  compile packages"));
        assert!(rendered.contains("   mod:   module maintenance"));
        assert!(rendered.contains("go help <command>"));
    }

    #[test]
    fn test_format_help_keeps_text() {
        colored::control::set_override(false);
        let help = "Usage: tool [opts]\n\nOPTIONS\n  -v  verbose\n";
        assert_eq!(format_help(help), help);
    }
}
