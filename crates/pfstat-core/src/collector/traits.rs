//! Abstractions for running external commands to enable testing and mocking.
//!
//! The `CommandRunner` trait allows the collector to invoke the real `pfctl`
//! binary on a BSD host and canned outputs in tests on any platform.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub status: Option<i32>,
    /// Whether the command exited successfully.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful run with the given standard output.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed run with exit code `code` and the given standard error.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Abstraction for locating and running programs.
pub trait CommandRunner: Send + Sync {
    /// Resolves a program name to an executable path.
    ///
    /// # Arguments
    /// * `program` - Bare name (searched in `PATH`) or a path
    ///
    /// # Returns
    /// The path to the executable, or a `NotFound` error.
    fn lookup(&self, program: &str) -> io::Result<PathBuf>;

    /// Runs `program` with `args` to completion and captures its output.
    ///
    /// A non-zero exit status is not an error at this level; it is reported
    /// through [`CommandOutput::success`].
    fn run(&self, program: &Path, args: &[String]) -> io::Result<CommandOutput>;
}

/// Runner that spawns real processes via `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn lookup(&self, program: &str) -> io::Result<PathBuf> {
        let path_var = std::env::var_os("PATH").unwrap_or_default();
        lookup_in(program, &path_var)
    }

    fn run(&self, program: &Path, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            status: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Searches `path_var` (a `PATH`-style list) for an executable named `program`.
///
/// Names containing a path separator are checked directly.
pub fn lookup_in(program: &str, path_var: &OsStr) -> io::Result<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return if is_executable(direct) {
            Ok(direct.to_path_buf())
        } else {
            Err(not_found(program))
        };
    }

    std::env::split_paths(path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(|| not_found(program))
}

fn not_found(program: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("executable file not found in $PATH: {program}"),
    )
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
