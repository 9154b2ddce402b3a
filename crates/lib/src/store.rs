//! Local archive store.
//!
//! A flat directory of `<project>-<fingerprint>.zip` files. There is no index:
//! the directory listing is the state. Archives are only ever added by an
//! atomic no-clobber rename from a dot-prefixed staging file, and only ever
//! removed by vacuum.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::archive::StagedArchive;
use crate::consts::STAGING_PREFIX;
use crate::fingerprint::ArchiveName;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to create archive store '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read archive store '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write '{path}': {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to place archive '{path}': {source}")]
  Place {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to delete '{path}': {source}")]
  Delete {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Result of placing an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
  Stored(PathBuf),
  /// An archive with the same name was already there; ours was discarded.
  AlreadyPresent(PathBuf),
}

impl PutOutcome {
  pub fn path(&self) -> &Path {
    match self {
      PutOutcome::Stored(path) | PutOutcome::AlreadyPresent(path) => path,
    }
  }
}

/// A file found in the store directory.
#[derive(Debug, Clone, Serialize)]
pub struct StoredArchive {
  pub file_name: String,
  pub path: PathBuf,
  pub size: u64,
  #[serde(skip)]
  pub modified: SystemTime,
}

#[derive(Debug, Clone)]
pub struct ArchiveStore {
  root: PathBuf,
}

impl ArchiveStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn path_of(&self, name: &ArchiveName) -> PathBuf {
    self.root.join(name.as_str())
  }

  pub fn exists(&self, name: &ArchiveName) -> bool {
    self.path_of(name).is_file()
  }

  /// Where archives are staged before `put`; same filesystem as the store.
  pub fn staging_dir(&self) -> &Path {
    &self.root
  }

  fn ensure_root(&self) -> Result<(), StoreError> {
    fs::create_dir_all(&self.root).map_err(|source| StoreError::CreateDir {
      path: self.root.clone(),
      source,
    })
  }

  /// Place a staged archive under its final name.
  pub fn put(&self, staged: StagedArchive, name: &ArchiveName) -> Result<PutOutcome, StoreError> {
    self.ensure_root()?;
    self.place(staged.into_temp_file(), name)
  }

  /// Store downloaded archive bytes under `name`.
  pub fn put_bytes(&self, name: &ArchiveName, bytes: &[u8]) -> Result<PutOutcome, StoreError> {
    self.ensure_root()?;

    let mut temp = tempfile::Builder::new()
      .prefix(STAGING_PREFIX)
      .suffix(".zip.part")
      .tempfile_in(&self.root)
      .map_err(|source| StoreError::Write {
        path: self.root.clone(),
        source,
      })?;

    let temp_path = temp.path().to_path_buf();
    temp
      .write_all(bytes)
      .and_then(|()| temp.flush())
      .map_err(|source| StoreError::Write { path: temp_path, source })?;

    self.place(temp, name)
  }

  fn place(&self, temp: NamedTempFile, name: &ArchiveName) -> Result<PutOutcome, StoreError> {
    let dest = self.path_of(name);

    if dest.exists() {
      debug!(path = %dest.display(), "archive already present, discarding staged copy");
      return Ok(PutOutcome::AlreadyPresent(dest));
    }

    match temp.persist_noclobber(&dest) {
      Ok(_) => {
        info!(path = %dest.display(), "stored archive");
        Ok(PutOutcome::Stored(dest))
      }
      Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
        debug!(path = %dest.display(), "archive appeared concurrently, discarding staged copy");
        Ok(PutOutcome::AlreadyPresent(dest))
      }
      Err(err) => Err(StoreError::Place {
        path: dest,
        source: err.error,
      }),
    }
  }

  /// Archives in the store, newest first.
  ///
  /// Staging files and anything without the archive extension are skipped.
  /// A store directory that does not exist yet is empty.
  pub fn list(&self) -> Result<Vec<StoredArchive>, StoreError> {
    let mut archives = self.scan(|name| !name.starts_with('.') && ArchiveName::parse(name).is_some())?;
    archives.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.file_name.cmp(&b.file_name)));
    Ok(archives)
  }

  /// Staging files left behind by interrupted runs.
  pub fn staging_leftovers(&self) -> Result<Vec<StoredArchive>, StoreError> {
    self.scan(|name| name.starts_with(STAGING_PREFIX))
  }

  fn scan(&self, keep: impl Fn(&str) -> bool) -> Result<Vec<StoredArchive>, StoreError> {
    let read_err = |source: io::Error| StoreError::Read {
      path: self.root.clone(),
      source,
    };

    let entries = match fs::read_dir(&self.root) {
      Ok(entries) => entries,
      Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(err) => return Err(read_err(err)),
    };

    let mut found = Vec::new();
    for entry in entries {
      let entry = entry.map_err(read_err)?;
      let file_name = match entry.file_name().to_str() {
        Some(name) => name.to_string(),
        None => continue,
      };
      if !keep(&file_name) {
        continue;
      }

      let metadata = entry.metadata().map_err(read_err)?;
      if !metadata.is_file() {
        continue;
      }

      found.push(StoredArchive {
        file_name,
        path: entry.path(),
        size: metadata.len(),
        modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
      });
    }

    Ok(found)
  }

  pub fn remove(&self, archive: &StoredArchive) -> Result<(), StoreError> {
    fs::remove_file(&archive.path).map_err(|source| StoreError::Delete {
      path: archive.path.clone(),
      source,
    })
  }
}
