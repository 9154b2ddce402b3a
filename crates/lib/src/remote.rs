//! Remote archive retrieval.
//!
//! A remote is just a URL template: `[ZIP]` is replaced by the archive
//! filename and the result is fetched with a plain GET. Every failure is a
//! cache miss, never an error; the caller falls through to building.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::validate_bytes;
use crate::consts::{APP_NAME, STAGING_PREFIX, ZIP_PLACEHOLDER};
use crate::fingerprint::ArchiveName;
use crate::store::ArchiveStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Why a remote fetch did not produce an archive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchMiss {
  #[error("request failed: {0}")]
  Transport(String),

  #[error("server returned HTTP {0}")]
  Status(u16),

  #[error("response is not a zip archive: {0}")]
  Malformed(String),

  #[error("could not keep downloaded archive: {0}")]
  Store(String),
}

/// Something that can GET a URL.
pub trait RemoteSource {
  fn get(&self, url: &str) -> Result<Vec<u8>, FetchMiss>;
}

/// `RemoteSource` over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpRemote {
  client: reqwest::blocking::Client,
}

impl HttpRemote {
  pub fn new() -> Result<Self, reqwest::Error> {
    let client = reqwest::blocking::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client })
  }
}

impl RemoteSource for HttpRemote {
  fn get(&self, url: &str) -> Result<Vec<u8>, FetchMiss> {
    let response = self
      .client
      .get(url)
      .send()
      .map_err(|e| FetchMiss::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchMiss::Status(status.as_u16()));
    }

    let bytes = response.bytes().map_err(|e| FetchMiss::Transport(e.to_string()))?;
    Ok(bytes.to_vec())
  }
}

/// A URL with a `[ZIP]` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTemplate(String);

impl RemoteTemplate {
  pub fn new(template: impl Into<String>) -> Self {
    Self(template.into())
  }

  /// Without a placeholder the name is appended as a final path segment.
  pub fn url_for(&self, name: &ArchiveName) -> String {
    if self.0.contains(ZIP_PLACEHOLDER) {
      self.0.replace(ZIP_PLACEHOLDER, name.as_str())
    } else {
      format!("{}/{}", self.0.trim_end_matches('/'), name)
    }
  }
}

/// Where a fetched archive ended up.
#[derive(Debug)]
pub enum FetchedArchive {
  /// In the local store, under its final name.
  Stored(PathBuf),
  /// In a temp file, deleted on drop; used when no store is configured.
  Temporary(TempPath),
}

impl FetchedArchive {
  pub fn path(&self) -> &Path {
    match self {
      FetchedArchive::Stored(path) => path.as_path(),
      FetchedArchive::Temporary(path) => path.as_ref(),
    }
  }
}

#[derive(Debug)]
pub enum RemoteOutcome {
  Hit(FetchedArchive),
  Miss(FetchMiss),
}

/// Try to download `name` from the remote.
pub fn try_fetch(
  template: &RemoteTemplate,
  name: &ArchiveName,
  remote: &dyn RemoteSource,
  store: Option<&ArchiveStore>,
) -> RemoteOutcome {
  let url = template.url_for(name);
  debug!(url = %url, "fetching archive from remote");

  let outcome = fetch(&url, name, remote, store);
  match &outcome {
    RemoteOutcome::Hit(archive) => {
      info!(url = %url, path = %archive.path().display(), "fetched archive from remote");
    }
    RemoteOutcome::Miss(FetchMiss::Status(404)) => {
      debug!(url = %url, "archive not on remote");
    }
    RemoteOutcome::Miss(reason) => {
      warn!(url = %url, reason = %reason, "remote fetch failed, falling back to build");
    }
  }
  outcome
}

fn fetch(url: &str, name: &ArchiveName, remote: &dyn RemoteSource, store: Option<&ArchiveStore>) -> RemoteOutcome {
  let bytes = match remote.get(url) {
    Ok(bytes) => bytes,
    Err(miss) => return RemoteOutcome::Miss(miss),
  };

  if let Err(err) = validate_bytes(&bytes) {
    return RemoteOutcome::Miss(FetchMiss::Malformed(err.to_string()));
  }

  let kept = match store {
    Some(store) => store
      .put_bytes(name, &bytes)
      .map(|outcome| FetchedArchive::Stored(outcome.path().to_path_buf()))
      .map_err(|e| e.to_string()),
    None => write_temporary(&bytes).map(FetchedArchive::Temporary),
  };

  match kept {
    Ok(archive) => RemoteOutcome::Hit(archive),
    Err(reason) => RemoteOutcome::Miss(FetchMiss::Store(reason)),
  }
}

fn write_temporary(bytes: &[u8]) -> Result<TempPath, String> {
  let mut file = tempfile::Builder::new()
    .prefix(STAGING_PREFIX)
    .suffix(".zip")
    .tempfile()
    .map_err(|e| e.to_string())?;
  file.write_all(bytes).map_err(|e| e.to_string())?;
  file.flush().map_err(|e| e.to_string())?;
  Ok(file.into_temp_path())
}
