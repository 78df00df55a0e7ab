// src/core/discovery.rs

use crate::core::cache::Cache;
use crate::core::command::{Command, CommandRef};
use crate::core::contracts::{Contract, ContractError};
use crate::core::errors::{DiscoveryError, Error, SymlinkError};
use crate::core::observer::Observer;
use crate::system::executor::Executor;
use log::{debug, trace};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use walkdir::{DirEntry, WalkDir};

/// Everything a contract needs to build commands at one level of the tree.
///
/// Contexts are immutable. Descending one level is done with [`next`](Self::next),
/// which spends one unit of the depth budget: 0 means no further modules and
/// -1 means unlimited.
#[derive(Debug, Clone)]
pub struct DiscoveryContext {
    remaining_depth: i32,
    contracts: Arc<[Arc<dyn Contract>]>,
    cache: Arc<dyn Cache>,
    executor: Arc<dyn Executor>,
    observer: Arc<dyn Observer>,
}

impl DiscoveryContext {
    pub fn new(
        max_depth: i32,
        contracts: Vec<Arc<dyn Contract>>,
        cache: Arc<dyn Cache>,
        executor: Arc<dyn Executor>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            remaining_depth: max_depth.max(-1),
            contracts: contracts.into(),
            cache,
            executor,
            observer,
        }
    }

    pub fn remaining_depth(&self) -> i32 {
        self.remaining_depth
    }

    /// The context for the level below. The budget never drops under 0,
    /// and an unlimited budget stays unlimited.
    pub fn next(&self) -> Self {
        let mut next = self.clone();
        if next.remaining_depth > 0 {
            next.remaining_depth -= 1;
        }
        next
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub fn observer(&self) -> &Arc<dyn Observer> {
        &self.observer
    }

    /// Discovers each directory in turn, keeping the given order.
    pub fn discover_all(
        &self,
        directories: &[PathBuf],
        parent: &Weak<Command>,
    ) -> (Vec<CommandRef>, Vec<Error>) {
        let mut commands = Vec::new();
        let mut errors = Vec::new();
        for directory in directories {
            let (found, errs) = self.discover_in(directory, parent);
            commands.extend(found);
            errors.extend(errs);
        }
        (commands, errors)
    }

    /// Scans one directory level, sorted by file name.
    ///
    /// An unreadable directory or entry is recorded as an error and the scan
    /// goes on, so the result holds whatever could be read.
    pub fn discover_in(&self, directory: &Path, parent: &Weak<Command>) -> (Vec<CommandRef>, Vec<Error>) {
        debug!(
            "discovering commands in {} (remaining depth {})",
            directory.display(),
            self.remaining_depth
        );
        let mut commands = Vec::new();
        let mut errors = Vec::new();

        let entries = WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in entries {
            match entry {
                Ok(entry) => match self.build_command(&entry, parent) {
                    Ok(Some(command)) => {
                        trace!("discovered {:?}", command);
                        commands.push(command);
                    }
                    Ok(None) => trace!("ignoring {}", entry.path().display()),
                    Err(e) => errors.push(e),
                },
                Err(e) => {
                    let path = e.path().unwrap_or(directory).to_path_buf();
                    errors.push(DiscoveryError::new(path, e).into());
                }
            }
        }

        (commands, errors)
    }

    /// Offers the entry to each contract in order; the first one that does not
    /// decline decides. Symlinks are classified by their target.
    fn build_command(&self, entry: &DirEntry, parent: &Weak<Command>) -> Result<Option<CommandRef>, Error> {
        let path = entry.path();

        let metadata = if entry.path_is_symlink() {
            resolve_symlink(path)?
        } else {
            entry
                .metadata()
                .map_err(|e| DiscoveryError::new(path, e))?
        };

        for contract in self.contracts.iter() {
            match contract.build_command(path, &metadata, parent, self) {
                Ok(command) => return Ok(command),
                Err(ContractError::NotApplicable) => continue,
                Err(ContractError::Io(e)) => return Err(DiscoveryError::new(path, e).into()),
            }
        }

        Ok(None)
    }
}

fn resolve_symlink(path: &Path) -> Result<fs::Metadata, SymlinkError> {
    let target = dunce::canonicalize(path).map_err(|e| SymlinkError::new(path, e))?;
    fs::metadata(&target).map_err(|e| SymlinkError::new(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::NullCache;
    use crate::core::contracts::default_contracts;
    use crate::core::observer::LoggingObserver;
    use crate::system::executor::SystemExecutor;
    use std::fs;
    use tempfile::tempdir;

    fn context(max_depth: i32) -> DiscoveryContext {
        DiscoveryContext::new(
            max_depth,
            default_contracts(crate::constants::DEFAULT_MODULE_METADATA_FILENAME),
            Arc::new(NullCache),
            Arc::new(SystemExecutor),
            Arc::new(LoggingObserver),
        )
    }

    #[test]
    fn test_next_spends_budget_down_to_zero() {
        let ctx = context(2);
        assert_eq!(ctx.next().remaining_depth(), 1);
        assert_eq!(ctx.next().next().remaining_depth(), 0);
        assert_eq!(ctx.next().next().next().remaining_depth(), 0);
        assert_eq!(context(-1).next().next().remaining_depth(), -1);
        assert_eq!(context(-5).remaining_depth(), -1);
    }

    #[test]
    fn test_missing_directory_is_reported() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let (commands, errors) = context(-1).discover_in(&missing, &Weak::new());
        assert!(commands.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::Discovery(_)));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::{PermissionsExt, symlink};

        fn executable(path: &Path, content: &str) {
            fs::write(path, content).unwrap();
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        #[test]
        fn test_discovers_sorted_and_skips_plain_files() {
            let dir = tempdir().unwrap();
            executable(&dir.path().join("zeta"), "#!/bin/sh\n# SUMMARY: last\n");
            executable(&dir.path().join("alpha"), "#!/bin/sh\n# SUMMARY: first\n");
            fs::write(dir.path().join("README"), "not executable").unwrap();
            fs::create_dir(dir.path().join("plain-dir")).unwrap();

            let (commands, errors) = context(-1).discover_in(dir.path(), &Weak::new());
            assert!(errors.is_empty());
            let names: Vec<&str> = commands.iter().map(|c| c.name()).collect();
            assert_eq!(names, vec!["alpha", "zeta"]);
            assert_eq!(commands[0].discovered_in(), Some(dir.path()));
        }

        #[test]
        fn test_symlinks_are_classified_by_target() {
            let dir = tempdir().unwrap();
            let target = dir.path().join("real");
            fs::create_dir(&target).unwrap();
            executable(&target.join("tool"), "#!/bin/sh\n");

            let bin = dir.path().join("bin");
            fs::create_dir(&bin).unwrap();
            symlink(target.join("tool"), bin.join("linked")).unwrap();
            symlink(dir.path().join("missing"), bin.join("broken")).unwrap();

            let (commands, errors) = context(-1).discover_in(&bin, &Weak::new());
            let names: Vec<&str> = commands.iter().map(|c| c.name()).collect();
            assert_eq!(names, vec!["linked"]);
            assert_eq!(commands[0].path(), bin.join("linked"));
            assert_eq!(errors.len(), 1);
            assert!(matches!(&errors[0], Error::Symlink(e) if e.path == bin.join("broken")));
        }

        #[test]
        fn test_directory_modules_respect_depth() {
            let dir = tempdir().unwrap();
            let module = dir.path().join("tools");
            fs::create_dir(&module).unwrap();
            fs::write(module.join(".exoskeleton"), "# SUMMARY: Tools\n").unwrap();
            executable(&module.join("hammer"), "#!/bin/sh\n");

            let (unlimited, _) = context(-1).discover_in(dir.path(), &Weak::new());
            assert_eq!(unlimited.len(), 1);
            assert!(unlimited[0].is_module());
            assert_eq!(unlimited[0].path(), module.join(".exoskeleton"));

            let (capped, errors) = context(0).discover_in(dir.path(), &Weak::new());
            assert!(capped.is_empty());
            assert!(errors.is_empty());
        }
    }
}
