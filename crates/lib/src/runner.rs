//! External process execution.
//!
//! The build command and the uploader are untrusted external processes whose
//! exit code is the only signal we act on. They run behind the
//! `CommandRunner` trait so tests can substitute a fake.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// A process to run: program, arguments, and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
}

impl Invocation {
  /// Run `script` through the platform shell.
  ///
  /// Unix uses `/bin/sh -c`, Windows uses `cmd.exe /C`. The user's `$SHELL`
  /// is not consulted, since interactive shells may source profile files.
  pub fn shell(script: &str) -> Self {
    let (program, flag) = platform_shell();
    Self {
      program: program.to_string(),
      args: vec![flag.to_string(), script.to_string()],
      cwd: None,
    }
  }

  pub fn current_dir(mut self, dir: &Path) -> Self {
    self.cwd = Some(dir.to_path_buf());
    self
  }

  /// The script of a shell invocation, i.e. the last argument.
  pub fn script(&self) -> Option<&str> {
    self.args.last().map(String::as_str)
  }
}

#[cfg(unix)]
fn platform_shell() -> (&'static str, &'static str) {
  ("/bin/sh", "-c")
}

#[cfg(windows)]
fn platform_shell() -> (&'static str, &'static str) {
  ("cmd.exe", "/C")
}

/// What a finished process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
  /// `None` when the process was terminated by a signal.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// stdout followed by stderr, for error reports.
  pub fn combined(&self) -> String {
    match (self.stdout.is_empty(), self.stderr.is_empty()) {
      (_, true) => self.stdout.clone(),
      (true, false) => self.stderr.clone(),
      (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
    }
  }
}

/// Runs external processes.
pub trait CommandRunner {
  /// Run to completion, capturing output.
  ///
  /// `Err` means the process could not be started; a non-zero exit is an
  /// `Ok` with `code` set.
  fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

/// Spawns real processes with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
  fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args);
    if let Some(cwd) = &invocation.cwd {
      command.current_dir(cwd);
    }

    debug!(program = %invocation.program, args = ?invocation.args, cwd = ?invocation.cwd, "spawning process");

    let output = command.output()?;
    let result = CommandOutput {
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.stdout.is_empty() {
      debug!(stdout = %result.stdout.trim_end(), "process stdout");
    }
    if !result.stderr.is_empty() {
      debug!(stderr = %result.stderr.trim_end(), "process stderr");
    }

    Ok(result)
  }
}
