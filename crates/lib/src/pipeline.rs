//! The single-invocation build flow.
//!
//! ```text
//! manifest -> fingerprint -> local hit?  -> extract
//!                         -> remote hit? -> extract
//!                         -> build -> archive -> dispatch
//! ```
//!
//! Without an archive directory nothing is cached locally: the remote is
//! still tried, and a build skips archiving entirely.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::archive::{ArchiveError, create_archive, extract_archive};
use crate::build::{BuildError, run_build};
use crate::config::{ProjectConfig, Settings};
use crate::fingerprint::{ArchiveName, Fingerprint, fingerprint};
use crate::manifest::{ManifestError, build_manifest};
use crate::remote::{FetchedArchive, RemoteOutcome, RemoteSource, RemoteTemplate, try_fetch};
use crate::runner::CommandRunner;
use crate::store::{ArchiveStore, StoreError};
use crate::store_lock::{LockMode, StoreLock, StoreLockError};
use crate::upload::{UploadStrategy, dispatch};

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Archive(#[from] ArchiveError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Lock(#[from] StoreLockError),
}

/// Progress notifications, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
  Fingerprinted {
    fingerprint: Fingerprint,
    archive: ArchiveName,
    files: usize,
  },
  LocalHit {
    archive: PathBuf,
  },
  RemoteHit {
    url: String,
  },
  RemoteMiss {
    url: String,
    reason: String,
  },
  Building {
    cmd: String,
  },
  Zipping {
    output_dir: PathBuf,
    archive: PathBuf,
  },
  Unzipping {
    archive: PathBuf,
    output_dir: PathBuf,
  },
  Stored {
    archive: PathBuf,
    already_present: bool,
  },
  Uploaded {
    archive: PathBuf,
  },
  UploadFailed {
    reason: String,
  },
}

/// Receives `BuildEvent`s; the CLI decides how they look.
pub trait Reporter {
  fn report(&self, event: &BuildEvent);
}

impl<F> Reporter for F
where
  F: Fn(&BuildEvent),
{
  fn report(&self, event: &BuildEvent) {
    self(event)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
  LocalHit,
  RemoteHit,
  Built,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
  pub status: CacheStatus,
  pub fingerprint: Fingerprint,
  pub archive_name: ArchiveName,
  /// The archive in the local store, if there is one.
  pub archive: Option<PathBuf>,
  pub upload_warning: Option<String>,
}

pub struct Pipeline<'a> {
  config: &'a ProjectConfig,
  settings: &'a Settings,
  runner: &'a dyn CommandRunner,
  remote: &'a dyn RemoteSource,
}

impl<'a> Pipeline<'a> {
  pub fn new(
    config: &'a ProjectConfig,
    settings: &'a Settings,
    runner: &'a dyn CommandRunner,
    remote: &'a dyn RemoteSource,
  ) -> Self {
    Self {
      config,
      settings,
      runner,
      remote,
    }
  }

  pub fn run(&self, reporter: &dyn Reporter) -> Result<BuildOutcome, PipelineError> {
    let config = self.config;
    let manifest = build_manifest(config)?;
    let fingerprint = fingerprint(&config.name, &manifest);
    let name = ArchiveName::new(&config.name, &fingerprint);

    info!(project = %config.name, fingerprint = %fingerprint, files = manifest.len(), "computed fingerprint");
    reporter.report(&BuildEvent::Fingerprinted {
      fingerprint: fingerprint.clone(),
      archive: name.clone(),
      files: manifest.len(),
    });

    let store = self.settings.archive_dir.clone().map(ArchiveStore::new);
    let _lock = match &store {
      Some(store) => Some(StoreLock::acquire(store.root(), LockMode::Shared, "build")?),
      None => None,
    };

    let outcome = |status, archive, upload_warning| BuildOutcome {
      status,
      fingerprint: fingerprint.clone(),
      archive_name: name.clone(),
      archive,
      upload_warning,
    };

    if let Some(store) = &store
      && store.exists(&name)
    {
      let archive = store.path_of(&name);
      reporter.report(&BuildEvent::LocalHit {
        archive: archive.clone(),
      });
      self.unpack(&archive, reporter)?;
      return Ok(outcome(CacheStatus::LocalHit, Some(archive), None));
    }

    if let Some(template) = &self.settings.remote {
      let template = RemoteTemplate::new(template.as_str());
      let url = template.url_for(&name);

      match try_fetch(&template, &name, self.remote, store.as_ref()) {
        RemoteOutcome::Hit(fetched) => {
          reporter.report(&BuildEvent::RemoteHit { url });
          self.unpack(fetched.path(), reporter)?;
          let archive = match fetched {
            FetchedArchive::Stored(path) => Some(path),
            FetchedArchive::Temporary(_) => None,
          };
          return Ok(outcome(CacheStatus::RemoteHit, archive, None));
        }
        RemoteOutcome::Miss(reason) => {
          reporter.report(&BuildEvent::RemoteMiss {
            url,
            reason: reason.to_string(),
          });
        }
      }
    }

    reporter.report(&BuildEvent::Building {
      cmd: config.build_cmd.clone(),
    });
    run_build(config, self.runner)?;

    let Some(store) = &store else {
      debug!("no archive directory configured, skipping archive");
      return Ok(outcome(CacheStatus::Built, None, None));
    };

    reporter.report(&BuildEvent::Zipping {
      output_dir: config.output_dir.clone(),
      archive: store.path_of(&name),
    });
    let staged = create_archive(&config.output_dir, store.staging_dir())?;

    let strategy = UploadStrategy::from_settings(self.settings);
    let dispatched = dispatch(staged, &name, store, &strategy, self.runner)?;
    reporter.report(&BuildEvent::Stored {
      archive: dispatched.archive.clone(),
      already_present: dispatched.already_present,
    });

    let upload_warning = match dispatched.upload {
      Some(Ok(())) => {
        reporter.report(&BuildEvent::Uploaded {
          archive: dispatched.archive.clone(),
        });
        None
      }
      Some(Err(err)) => {
        let reason = err.to_string();
        reporter.report(&BuildEvent::UploadFailed { reason: reason.clone() });
        Some(reason)
      }
      None => None,
    };

    Ok(outcome(CacheStatus::Built, Some(dispatched.archive), upload_warning))
  }

  fn unpack(&self, archive: &std::path::Path, reporter: &dyn Reporter) -> Result<(), ArchiveError> {
    reporter.report(&BuildEvent::Unzipping {
      archive: archive.to_path_buf(),
      output_dir: self.config.output_dir.clone(),
    });
    extract_archive(archive, &self.config.output_dir)?;
    Ok(())
  }
}
