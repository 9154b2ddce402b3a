//! Fingerprints and archive names.
//!
//! A fingerprint is a truncated SHA-256 over the project name and every
//! manifest entry (path and content hash). Archive names embed both the
//! project name and the fingerprint: `<name>-<fingerprint>.zip`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::{ARCHIVE_EXTENSION, FINGERPRINT_LEN};
use crate::manifest::Manifest;

/// A 20-character lowercase hex identifier for a manifest state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Compute the fingerprint for `project_name` at the given manifest state.
pub fn fingerprint(project_name: &str, manifest: &Manifest) -> Fingerprint {
  let mut hasher = Sha256::new();
  hasher.update(project_name.as_bytes());
  hasher.update(b"\n");

  for entry in manifest.entries() {
    hasher.update(entry.path.as_bytes());
    hasher.update(b"\0");
    hasher.update(entry.hash.0.as_bytes());
    hasher.update(b"\n");
  }

  let full = hex::encode(hasher.finalize());
  Fingerprint(full[..FINGERPRINT_LEN].to_string())
}

/// Filename of an archive in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArchiveName(String);

impl ArchiveName {
  pub fn new(project_name: &str, fingerprint: &Fingerprint) -> Self {
    Self(format!("{}-{}.{}", project_name, fingerprint, ARCHIVE_EXTENSION))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Split a store filename back into `(project, fingerprint)`.
  ///
  /// Returns `None` for anything that is not `<name>-<20 hex>.zip`.
  pub fn parse(file_name: &str) -> Option<(&str, &str)> {
    let stem = file_name.strip_suffix(ARCHIVE_EXTENSION)?.strip_suffix('.')?;
    let (project, fp) = stem.rsplit_once('-')?;
    let is_fingerprint = fp.len() == FINGERPRINT_LEN && fp.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));

    if project.is_empty() || !is_fingerprint {
      return None;
    }
    Some((project, fp))
  }
}

impl std::fmt::Display for ArchiveName {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}
