//! In-memory command runner for testing collectors without `pfctl`.
//!
//! This module provides `MockRunner` which resolves program names and answers
//! invocations from tables filled in by the test, so collector tests run on any
//! platform, including CI machines without pf.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::scenarios;
use crate::collector::traits::{CommandOutput, CommandRunner};

/// A recorded call to [`CommandRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Command runner backed by in-memory tables.
#[derive(Debug, Default)]
pub struct MockRunner {
    /// Program name to resolved path.
    programs: HashMap<String, PathBuf>,
    /// Resolved path to the output it produces.
    outputs: HashMap<PathBuf, CommandOutput>,
    /// Every invocation, in order.
    calls: Mutex<Vec<Invocation>>,
}

impl MockRunner {
    /// Creates a runner that knows no programs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `name` resolvable to `path`.
    pub fn add_program(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.programs.insert(name.into(), path.into());
    }

    /// Sets the output produced when `path` is run.
    pub fn add_output(&mut self, path: impl Into<PathBuf>, output: CommandOutput) {
        self.outputs.insert(path.into(), output);
    }

    /// Host with pf enabled and `set loginterface em0`.
    ///
    /// `pfctl` lives in `/sbin`, `doas` in `/usr/bin`; both print
    /// [`scenarios::PFCTL_INFO_FULL`].
    pub fn typical_pf() -> Self {
        Self::with_output(scenarios::PFCTL_INFO_FULL)
    }

    /// Same layout as [`MockRunner::typical_pf`] with arbitrary output.
    pub fn with_output(stdout: &str) -> Self {
        let mut runner = Self::new();
        runner.add_program("pfctl", "/sbin/pfctl");
        runner.add_program("doas", "/usr/bin/doas");
        runner.add_output("/sbin/pfctl", CommandOutput::success(stdout));
        runner.add_output("/usr/bin/doas", CommandOutput::success(stdout));
        runner
    }

    /// Returns all recorded invocations.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CommandRunner for MockRunner {
    fn lookup(&self, program: &str) -> io::Result<PathBuf> {
        self.programs.get(program).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("executable file not found in $PATH: {program}"),
            )
        })
    }

    fn run(&self, program: &Path, args: &[String]) -> io::Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Invocation {
                program: program.to_path_buf(),
                args: args.to_vec(),
            });
        }
        self.outputs.get(program).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", program.display()),
            )
        })
    }
}
