//! Archive dispatch: placing a fresh archive in the store and handing it to
//! the uploader.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::StagedArchive;
use crate::config::Settings;
use crate::consts::ZIP_PLACEHOLDER;
use crate::fingerprint::ArchiveName;
use crate::runner::{CommandRunner, Invocation};
use crate::store::{ArchiveStore, PutOutcome, StoreError};

/// What happens to an archive once it is in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadStrategy {
  /// Keep it in the store only.
  #[default]
  MoveToStore,
  /// Also run this command template, with `[ZIP]` replaced by the archive path.
  Command(String),
}

impl UploadStrategy {
  pub fn from_settings(settings: &Settings) -> Self {
    match &settings.uploader {
      Some(template) => UploadStrategy::Command(template.clone()),
      None => UploadStrategy::MoveToStore,
    }
  }
}

#[derive(Debug, Error)]
pub enum UploadError {
  #[error("failed to start uploader '{cmd}': {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("uploader failed with exit code {code:?}: {cmd}")]
  Failed {
    cmd: String,
    code: Option<i32>,
    output: String,
  },
}

#[derive(Debug)]
pub struct Dispatched {
  /// Final location in the store.
  pub archive: PathBuf,
  pub already_present: bool,
  /// `None` when no uploader ran.
  pub upload: Option<Result<(), UploadError>>,
}

/// Expand an uploader template for `archive`.
///
/// A template without `[ZIP]` gets the path appended as its last argument.
pub fn uploader_command(template: &str, archive: &Path) -> String {
  let path = quote_path(archive);
  if template.contains(ZIP_PLACEHOLDER) {
    template.replace(ZIP_PLACEHOLDER, &path)
  } else {
    format!("{} {}", template.trim_end(), path)
  }
}

/// Quote `path` for `/bin/sh`. Anything beyond a conservative set of
/// characters is single-quoted, with embedded `'` written as `'\''`.
#[cfg(not(windows))]
fn quote_path(path: &Path) -> String {
  let raw = path.display().to_string();
  let plain = !raw.is_empty()
    && raw
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | ':' | ',' | '=' | '@' | '%'));
  if plain {
    raw
  } else {
    format!("'{}'", raw.replace('\'', r"'\''"))
  }
}

/// Quote `path` for `cmd.exe`. Paths cannot contain `"`, so wrapping in
/// double quotes is enough for whitespace and the shell metacharacters.
#[cfg(windows)]
fn quote_path(path: &Path) -> String {
  let raw = path.display().to_string();
  if raw.chars().any(|c| c.is_whitespace() || matches!(c, '&' | '|' | '<' | '>' | '^' | '(' | ')' | '%' | '!')) {
    format!("\"{raw}\"")
  } else {
    raw
  }
}

/// Put `staged` into the store, then run the uploader if one is configured.
///
/// Only a store failure is an error. An uploader failure is returned inside
/// `Dispatched` and leaves the stored archive in place.
pub fn dispatch(
  staged: StagedArchive,
  name: &ArchiveName,
  store: &ArchiveStore,
  strategy: &UploadStrategy,
  runner: &dyn CommandRunner,
) -> Result<Dispatched, StoreError> {
  let outcome = store.put(staged, name)?;
  let already_present = matches!(outcome, PutOutcome::AlreadyPresent(_));
  let archive = outcome.path().to_path_buf();

  let upload = match strategy {
    UploadStrategy::MoveToStore => None,
    UploadStrategy::Command(_) if already_present => {
      debug!(archive = %archive.display(), "archive was already stored, not re-uploading");
      None
    }
    UploadStrategy::Command(template) => Some(run_uploader(template, &archive, runner)),
  };

  Ok(Dispatched {
    archive,
    already_present,
    upload,
  })
}

fn run_uploader(template: &str, archive: &Path, runner: &dyn CommandRunner) -> Result<(), UploadError> {
  let absolute = dunce::canonicalize(archive).unwrap_or_else(|_| archive.to_path_buf());
  let cmd = uploader_command(template, &absolute);
  info!(cmd = %cmd, "running uploader");

  let output = runner
    .run(&Invocation::shell(&cmd))
    .map_err(|source| UploadError::Spawn { cmd: cmd.clone(), source })?;

  if !output.success() {
    warn!(cmd = %cmd, code = ?output.code, "uploader failed");
    return Err(UploadError::Failed {
      cmd,
      code: output.code,
      output: output.combined(),
    });
  }

  Ok(())
}
