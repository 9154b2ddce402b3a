//! Running the project's build command.
//!
//! The command is opaque: it runs through the platform shell with the input
//! root as working directory, and only its exit code matters. Whether the
//! output directory was actually populated is checked later by the archiver.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::ProjectConfig;
use crate::runner::{CommandOutput, CommandRunner, Invocation};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("failed to start build command '{cmd}': {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("build command failed with exit code {code:?}: {cmd}")]
  Failed {
    cmd: String,
    code: Option<i32>,
    /// Captured stdout and stderr.
    output: String,
  },
}

/// Run the configured build command in the project root.
///
/// Not retried on failure.
pub fn run_build(config: &ProjectConfig, runner: &dyn CommandRunner) -> Result<CommandOutput, BuildError> {
  info!(cmd = %config.build_cmd, root = %config.input_root.display(), "running build command");

  let invocation = Invocation::shell(&config.build_cmd).current_dir(&config.input_root);
  let output = runner.run(&invocation).map_err(|source| BuildError::Spawn {
    cmd: config.build_cmd.clone(),
    source,
  })?;

  if !output.success() {
    debug!(code = ?output.code, "build command failed");
    return Err(BuildError::Failed {
      cmd: config.build_cmd.clone(),
      code: output.code,
      output: output.combined(),
    });
  }

  Ok(output)
}
