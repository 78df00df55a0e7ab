//! Builds command-line programs whose subcommands are executables, scripts and
//! directories discovered on the filesystem.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

pub mod cli;
pub mod constants;
pub mod core;
pub mod system;

pub use crate::core::entrypoint::{Entrypoint, EntrypointBuilder};
pub use crate::core::errors::{Error, ExecError, IdentifyError};

#[cfg(test)]
pub(crate) mod testing;
