// src/core/mod.rs

pub mod builtin;
pub mod cache;
pub mod command;
pub mod commands;
pub mod config;
pub mod contracts;
pub mod discovery;
pub mod entrypoint;
pub mod errors;
pub mod executable;
pub mod identify;
pub mod menu;
pub mod module;
pub mod observer;
pub mod shellcomp;
pub mod suggestions;
