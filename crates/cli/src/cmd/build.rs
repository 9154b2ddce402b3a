//! `--build`: restore the output directory from an archive, or build it.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use hashibuild_lib::build::BuildError;
use hashibuild_lib::config::{ProjectConfig, Settings};
use hashibuild_lib::pipeline::{BuildEvent, CacheStatus, Pipeline, PipelineError, Reporter};
use hashibuild_lib::remote::HttpRemote;
use hashibuild_lib::runner::ProcessRunner;

use crate::output::{
  OutputFormat, human_elapsed, print_archive_step, print_json, print_step, print_summary, print_warning,
};

/// Prints pipeline progress as it happens.
struct TerminalReporter {
  quiet: bool,
  verbose: bool,
}

impl Reporter for TerminalReporter {
  fn report(&self, event: &BuildEvent) {
    if self.quiet {
      return;
    }
    match event {
      BuildEvent::Fingerprinted {
        fingerprint, files, ..
      } if self.verbose => {
        print_step(&format!("Fingerprint {} ({} files)", fingerprint, files));
      }
      BuildEvent::LocalHit { archive } => {
        print_archive_step("Found archive", archive, "");
      }
      BuildEvent::RemoteHit { url } => {
        print_step(&format!("Downloaded {}", url));
      }
      BuildEvent::RemoteMiss { url, reason } if self.verbose => {
        print_step(&format!("Not available from {} ({})", url, reason));
      }
      BuildEvent::Building { cmd } => {
        print_step(&format!("Running build command '{}'", cmd));
      }
      BuildEvent::Zipping { output_dir, archive } => {
        print_archive_step(&format!("Zipping {} to", output_dir.display()), archive, "");
      }
      BuildEvent::Unzipping { archive, output_dir } => {
        print_archive_step("Unzip", archive, &format!(" to {}", output_dir.display()));
      }
      BuildEvent::Stored {
        archive,
        already_present: true,
      } => {
        print_archive_step("Archive", archive, " already present");
      }
      BuildEvent::Uploaded { archive } => {
        print_archive_step("Uploaded", archive, "");
      }
      BuildEvent::UploadFailed { reason } => {
        print_warning(&format!("Upload failed, archive kept locally: {}", reason));
      }
      _ => {}
    }
  }
}

pub fn cmd_build(config: &ProjectConfig, settings: &Settings, verbose: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let remote = HttpRemote::new().context("Failed to initialise HTTP client")?;
  let runner = ProcessRunner;
  let reporter = TerminalReporter {
    quiet: output.is_json(),
    verbose,
  };

  let outcome = match Pipeline::new(config, settings, &runner, &remote).run(&reporter) {
    Ok(outcome) => outcome,
    Err(PipelineError::Build(BuildError::Failed { output: captured, .. })) if !captured.is_empty() => {
      eprintln!("Build output:\n{}", captured.trim_end());
      anyhow::bail!("Build failed for project '{}'", config.name);
    }
    Err(err) => return Err(err).context(format!("Build failed for project '{}'", config.name)),
  };

  debug!(status = ?outcome.status, archive = ?outcome.archive, "build finished");

  if output.is_json() {
    return print_json(&outcome);
  }

  let headline = match outcome.status {
    CacheStatus::LocalHit => "Restored from local archive",
    CacheStatus::RemoteHit => "Restored from remote archive",
    CacheStatus::Built => "Build complete",
  };
  let mut rows = vec![("Fingerprint", outcome.fingerprint.to_string())];
  if let Some(archive) = &outcome.archive {
    rows.push(("Archive", archive.display().to_string()));
  }
  rows.push(("Output", config.output_dir.display().to_string()));
  rows.push(("Duration", human_elapsed(start.elapsed())));
  print_summary(headline, &rows);

  Ok(())
}
