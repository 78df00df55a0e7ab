// src/core/contracts.rs

use crate::constants::EXECUTABLE_MODULE_EXTENSION;
use crate::core::command::{Command, CommandRef};
use crate::core::discovery::DiscoveryContext;
use crate::core::executable::{Flavor, is_script};
use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::sync::{Arc, Weak};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContractError {
    /// Not an error: the entry is offered to the next contract.
    #[error("contract does not apply")]
    NotApplicable,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// An agreement about how a filesystem entry becomes a command.
///
/// Discovery tries contracts in order. The first one that does not return
/// [`ContractError::NotApplicable`] decides: `Ok(Some(_))` adds a command and
/// `Ok(None)` silently skips the entry.
pub trait Contract: Send + Sync + fmt::Debug {
    fn build_command(
        &self,
        path: &Path,
        metadata: &Metadata,
        parent: &Weak<Command>,
        context: &DiscoveryContext,
    ) -> Result<Option<CommandRef>, ContractError>;
}

/// The built-in contracts in priority order.
pub fn default_contracts(metadata_filename: &str) -> Vec<Arc<dyn Contract>> {
    vec![
        Arc::new(DirectoryContract::new(metadata_filename)),
        Arc::new(ExecutableModuleContract),
        Arc::new(ShellScriptContract),
        Arc::new(StandaloneExecutableContract),
    ]
}

/// A directory containing the module metadata file is a module.
#[derive(Debug, Clone)]
pub struct DirectoryContract {
    metadata_filename: String,
}

impl DirectoryContract {
    pub fn new(metadata_filename: impl Into<String>) -> Self {
        Self {
            metadata_filename: metadata_filename.into(),
        }
    }
}

impl Contract for DirectoryContract {
    fn build_command(
        &self,
        path: &Path,
        metadata: &Metadata,
        parent: &Weak<Command>,
        context: &DiscoveryContext,
    ) -> Result<Option<CommandRef>, ContractError> {
        if !metadata.is_dir() {
            return Err(ContractError::NotApplicable);
        }

        let metadata_file = path.join(&self.metadata_filename);
        // Anything but a definite "not found" counts as present.
        if matches!(metadata_file.try_exists(), Ok(false)) {
            return Err(ContractError::NotApplicable);
        }

        if context.remaining_depth() == 0 {
            return Ok(None);
        }

        Ok(Some(Command::directory_module(
            file_name(path),
            metadata_file,
            path,
            parent,
            context.next(),
        )))
    }
}

/// An executable named `<name>.exoskeleton` describes its own subtree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutableModuleContract;

impl Contract for ExecutableModuleContract {
    fn build_command(
        &self,
        path: &Path,
        metadata: &Metadata,
        parent: &Weak<Command>,
        context: &DiscoveryContext,
    ) -> Result<Option<CommandRef>, ContractError> {
        if metadata.is_dir() {
            return Err(ContractError::NotApplicable);
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some(EXECUTABLE_MODULE_EXTENSION) {
            return Err(ContractError::NotApplicable);
        }
        if !is_executable(metadata) {
            return Err(ContractError::NotApplicable);
        }

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        // Out of depth: still runnable, just not expandable.
        if context.remaining_depth() == 0 {
            return Ok(Some(Command::executable(
                name,
                path,
                parent,
                Flavor::Binary,
                context,
            )));
        }

        Ok(Some(Command::executable_module(name, path, parent, context.next())))
    }
}

/// An executable starting with `#!` documents itself with magic comments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellScriptContract;

impl Contract for ShellScriptContract {
    fn build_command(
        &self,
        path: &Path,
        metadata: &Metadata,
        parent: &Weak<Command>,
        context: &DiscoveryContext,
    ) -> Result<Option<CommandRef>, ContractError> {
        if metadata.is_dir() || !is_executable(metadata) {
            return Err(ContractError::NotApplicable);
        }
        if !is_script(path)? {
            return Err(ContractError::NotApplicable);
        }

        Ok(Some(Command::executable(
            file_name(path),
            path,
            parent,
            Flavor::Script,
            context,
        )))
    }
}

/// Any other executable answers `--summary` and `--help`. Keep it last: it
/// accepts every executable file.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandaloneExecutableContract;

impl Contract for StandaloneExecutableContract {
    fn build_command(
        &self,
        path: &Path,
        metadata: &Metadata,
        parent: &Weak<Command>,
        context: &DiscoveryContext,
    ) -> Result<Option<CommandRef>, ContractError> {
        if metadata.is_dir() || !is_executable(metadata) {
            return Err(ContractError::NotApplicable);
        }

        Ok(Some(Command::executable(
            file_name(path),
            path,
            parent,
            Flavor::Binary,
            context,
        )))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(metadata: &Metadata) -> bool {
    metadata.is_file()
}
