// src/testing.rs
//! Fakes shared by the unit tests.

use crate::core::command::CommandRef;
use crate::core::entrypoint::Entrypoint;
use crate::core::errors::Error;
use crate::core::observer::Observer;
use crate::system::executor::{ExecutionError, Executor, Invocation};
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

/// An executor that never spawns anything. Responses are keyed by the
/// invocation's arguments (the program is ignored) and every call is recorded.
#[derive(Debug, Default)]
pub(crate) struct RecordingExecutor {
    responses: Mutex<HashMap<String, Result<String, i32>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl RecordingExecutor {
    pub(crate) fn respond(&self, args: &[&str], output: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(args.join(" "), Ok(output.to_string()));
    }

    pub(crate) fn fail(&self, args: &[&str], code: i32) {
        self.responses.lock().unwrap().insert(args.join(" "), Err(code));
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, args: &[&str]) -> usize {
        let key = args.join(" ");
        self.calls()
            .iter()
            .filter(|call| call.args.join(" ") == key)
            .count()
    }

    fn lookup(&self, invocation: &Invocation) -> Result<String, ExecutionError> {
        self.calls.lock().unwrap().push(invocation.clone());
        match self.responses.lock().unwrap().get(&invocation.args.join(" ")) {
            Some(Ok(output)) => Ok(output.clone()),
            Some(Err(code)) => Err(ExecutionError::NonZeroExitStatus {
                command: invocation.command_line(),
                code: *code,
            }),
            None => Err(ExecutionError::CommandFailed(
                invocation.command_line(),
                io::Error::new(io::ErrorKind::NotFound, "no canned response"),
            )),
        }
    }
}

impl Executor for RecordingExecutor {
    fn capture_output(&self, invocation: &Invocation) -> Result<String, ExecutionError> {
        self.lookup(invocation)
    }

    fn run(&self, invocation: &Invocation) -> Result<i32, ExecutionError> {
        match self.lookup(invocation) {
            Ok(_) => Ok(0),
            Err(ExecutionError::NonZeroExitStatus { code, .. }) => Ok(code),
            Err(e) => Err(e),
        }
    }
}

/// Keeps every reported error and not-found event instead of printing them.
#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
    pub(crate) errors: Mutex<Vec<String>>,
    pub(crate) not_found: Mutex<Vec<(String, Vec<String>)>>,
}

impl Observer for RecordingObserver {
    fn on_error(&self, error: &Error) {
        self.errors.lock().unwrap().push(error.to_string());
    }

    fn on_command_not_found(
        &self,
        entrypoint: &Entrypoint,
        command: &CommandRef,
        suggestions: &[CommandRef],
    ) {
        self.not_found.lock().unwrap().push((
            entrypoint.relative_usage(command),
            suggestions.iter().map(|s| s.usage()).collect(),
        ));
    }
}
