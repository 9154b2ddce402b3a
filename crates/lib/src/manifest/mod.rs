//! Project manifest computation.
//!
//! The manifest is the ordered set of project-relative file paths (with their
//! content hashes) that make up a project. It drives both the `--manifest`
//! display and the fingerprint.
//!
//! Order is directory-walk order with siblings sorted by file name, so the
//! same tree always yields the same manifest.

pub mod ignore;

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::config::{ConfigError, ProjectConfig};
use crate::consts::DEFAULT_TREE_IGNORES;
use crate::util::hash::{ContentHash, HashError, hash_file};

pub use ignore::IgnoreRules;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("failed to walk directory: {0}")]
  Walk(#[from] walkdir::Error),

  #[error(transparent)]
  Hash(#[from] HashError),
}

/// A single file in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
  /// Project-relative path with `/` separators.
  pub path: String,
  pub hash: ContentHash,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
  entries: Vec<ManifestEntry>,
}

impl Manifest {
  pub fn entries(&self) -> &[ManifestEntry] {
    &self.entries
  }

  pub fn paths(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|entry| entry.path.as_str())
  }

  pub fn contains(&self, path: &str) -> bool {
    self.entries.iter().any(|entry| entry.path == path)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Compute the manifest for a project.
///
/// Walks `input_root` (or each of `input_paths` beneath it), skipping
/// anything matched by the configured ignores. An ignored directory is not
/// descended into. When `output_dir` lies inside the input root it is pruned
/// as well, so build results never feed back into the fingerprint.
///
/// # Errors
///
/// `ConfigError::RootNotFound` if the root is missing,
/// `ConfigError::InputNotFound` if an input path is missing, and walk/read
/// errors for anything that disappears or is unreadable mid-walk.
pub fn build_manifest(config: &ProjectConfig) -> Result<Manifest, ManifestError> {
  let rules = IgnoreRules::new(config.ignores.as_slice())?;
  let exclude = nested_output(&config.input_root, &config.output_dir);
  if let Some(rel) = &exclude {
    debug!(path = %rel, "output directory is inside the input root, excluding it");
  }
  collect(&config.input_root, &config.input_paths, &rules, exclude.as_deref())
}

/// Compute the manifest of an arbitrary directory using the default ignores.
pub fn tree_manifest(root: &Path) -> Result<Manifest, ManifestError> {
  let rules = IgnoreRules::new(DEFAULT_TREE_IGNORES)?;
  collect(root, &[], &rules, None)
}

/// Canonical form of `path`, falling back to its canonical parent when the
/// path itself does not exist yet.
fn resolve(path: &Path) -> PathBuf {
  if let Ok(canonical) = dunce::canonicalize(path) {
    return canonical;
  }
  match (path.parent(), path.file_name()) {
    (Some(parent), Some(name)) => dunce::canonicalize(parent)
      .map(|parent| parent.join(name))
      .unwrap_or_else(|_| path.to_path_buf()),
    _ => path.to_path_buf(),
  }
}

/// Root-relative path of `output_dir` when it is a strict descendant of `root`.
fn nested_output(root: &Path, output_dir: &Path) -> Option<String> {
  let root = resolve(root);
  let output = resolve(output_dir);
  if !output.starts_with(&root) {
    return None;
  }
  let rel = relative_path(&root, &output);
  (!rel.is_empty()).then_some(rel)
}

fn collect(
  root: &Path,
  input_paths: &[String],
  rules: &IgnoreRules,
  exclude: Option<&str>,
) -> Result<Manifest, ManifestError> {
  if !root.is_dir() {
    return Err(ConfigError::RootNotFound(root.to_path_buf()).into());
  }

  let mut seen = HashSet::new();
  let mut entries = Vec::new();

  if input_paths.is_empty() {
    walk(root, root, rules, exclude, &mut seen, &mut entries)?;
  } else {
    for sub in input_paths {
      let start = root.join(sub);
      if !start.exists() {
        return Err(ConfigError::InputNotFound(start).into());
      }
      walk(root, &start, rules, exclude, &mut seen, &mut entries)?;
    }
  }

  debug!(root = %root.display(), files = entries.len(), "computed manifest");
  Ok(Manifest { entries })
}

fn walk(
  root: &Path,
  start: &Path,
  rules: &IgnoreRules,
  exclude: Option<&str>,
  seen: &mut HashSet<String>,
  entries: &mut Vec<ManifestEntry>,
) -> Result<(), ManifestError> {
  let walker = WalkDir::new(start).sort_by_file_name().into_iter().filter_entry(|e| {
    let rel = relative_path(root, e.path());
    if rel.is_empty() {
      return true;
    }
    if exclude.is_some_and(|out| rel == out) {
      trace!(path = %rel, "skipping output directory");
      return false;
    }
    let keep = !rules.is_ignored(&rel, e.file_type().is_dir());
    if !keep {
      trace!(path = %rel, "ignored");
    }
    keep
  });

  for entry in walker {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }

    let rel = relative_path(root, entry.path());
    if seen.contains(&rel) {
      continue;
    }

    let hash = hash_file(entry.path())?;
    seen.insert(rel.clone());
    entries.push(ManifestEntry { path: rel, hash });
  }

  Ok(())
}

/// Path of `path` relative to `root`, joined with `/` on every platform.
fn relative_path(root: &Path, path: &Path) -> String {
  let rel = path.strip_prefix(root).unwrap_or(path);
  rel
    .components()
    .filter_map(|c| match c {
      Component::Normal(part) => Some(part.to_string_lossy()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/")
}
