//! Store cleanup.
//!
//! Vacuum deletes archives chosen by a [`RetentionPolicy`] together with any
//! staging files an interrupted build left behind. It holds the store lock
//! exclusively, so it never races a build that is reading or writing archives.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{ArchiveStore, StoreError, StoredArchive};
use crate::store_lock::{LockMode, StoreLock, StoreLockError};

#[derive(Debug, Error)]
pub enum VacuumError {
  #[error(transparent)]
  Lock(#[from] StoreLockError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Which archives a vacuum removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetentionPolicy {
  /// Remove every archive.
  #[default]
  All,
  /// Keep the `n` most recently modified archives.
  KeepLatest(usize),
  /// Remove archives last modified longer ago than this.
  OlderThan(Duration),
}

#[derive(Debug, Default, serde::Serialize)]
pub struct VacuumStats {
  pub archives_scanned: usize,
  pub archives_deleted: usize,
  pub staging_deleted: usize,
  pub bytes_freed: u64,
}

#[derive(Debug, serde::Serialize)]
pub struct VacuumResult {
  pub stats: VacuumStats,
  pub deleted_paths: Vec<PathBuf>,
  pub dry_run: bool,
}

/// Pick the archives `policy` removes. `archives` must be newest first, as
/// returned by `ArchiveStore::list`.
pub fn select_victims<'a>(
  archives: &'a [StoredArchive],
  policy: RetentionPolicy,
  now: SystemTime,
) -> Vec<&'a StoredArchive> {
  match policy {
    RetentionPolicy::All => archives.iter().collect(),
    RetentionPolicy::KeepLatest(n) => archives.iter().skip(n).collect(),
    RetentionPolicy::OlderThan(max_age) => archives
      .iter()
      .filter(|archive| {
        now
          .duration_since(archive.modified)
          .map(|age| age > max_age)
          .unwrap_or(false)
      })
      .collect(),
  }
}

/// Prune the store.
///
/// Takes the store lock exclusively, so it fails fast while a build is
/// running. Staging files left by interrupted runs are always removed. With
/// `dry_run`, reports what would be removed without touching anything.
pub fn vacuum(store: &ArchiveStore, policy: RetentionPolicy, dry_run: bool) -> Result<VacuumResult, VacuumError> {
  let _lock = StoreLock::acquire(store.root(), LockMode::Exclusive, "vacuum")?;

  let mut stats = VacuumStats::default();
  let mut deleted_paths = Vec::new();

  let archives = store.list()?;
  stats.archives_scanned = archives.len();

  for archive in select_victims(&archives, policy, SystemTime::now()) {
    debug!(path = %archive.path.display(), "removing archive");
    if sweep(store, archive, dry_run) {
      stats.archives_deleted += 1;
      stats.bytes_freed += archive.size;
      deleted_paths.push(archive.path.clone());
    }
  }

  for leftover in store.staging_leftovers()? {
    debug!(path = %leftover.path.display(), "removing staging leftover");
    if sweep(store, &leftover, dry_run) {
      stats.staging_deleted += 1;
      stats.bytes_freed += leftover.size;
      deleted_paths.push(leftover.path);
    }
  }

  info!(
    store = %store.root().display(),
    archives_deleted = stats.archives_deleted,
    staging_deleted = stats.staging_deleted,
    bytes_freed = stats.bytes_freed,
    dry_run,
    "vacuum complete"
  );

  Ok(VacuumResult {
    stats,
    deleted_paths,
    dry_run,
  })
}

fn sweep(store: &ArchiveStore, archive: &StoredArchive, dry_run: bool) -> bool {
  if dry_run {
    return true;
  }
  match store.remove(archive) {
    Ok(()) => true,
    Err(e) => {
      warn!(error = %e, "failed to delete archive");
      false
    }
  }
}
