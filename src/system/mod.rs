//! # System Interaction Layer
//!
//! The boundary between the command tree and the operating system.
//!
//! - **`executor`**: spawns discovered executables, either capturing their standard
//!   output (for `--summary`, `--help`, `--describe-commands` and `--complete`) or
//!   handing them the terminal once a command has been resolved.

pub mod executor;
