//! Zip packaging of build output.
//!
//! Archives are written into a dot-prefixed temp file inside the store so a
//! half-written archive never carries its final name. Extraction goes the
//! other way: into a sibling temp directory that replaces the output
//! directory only once it is complete.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::consts::STAGING_PREFIX;

const LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

#[derive(Debug, Error)]
pub enum ArchiveError {
  #[error("output directory does not exist: {0}")]
  MissingOutput(PathBuf),

  #[error("I/O error on '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("zip error on '{path}': {source}")]
  Zip {
    path: PathBuf,
    #[source]
    source: ZipError,
  },

  #[error("not a readable zip archive: {0}")]
  Malformed(#[source] ZipError),

  #[error("archive entry escapes the destination: {0}")]
  UnsafeEntry(String),

  #[error("failed to walk output directory: {0}")]
  Walk(#[from] walkdir::Error),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
  move |source| ArchiveError::Io {
    path: path.to_path_buf(),
    source,
  }
}

fn zip_err(path: &Path) -> impl FnOnce(ZipError) -> ArchiveError + '_ {
  move |source| ArchiveError::Zip {
    path: path.to_path_buf(),
    source,
  }
}

/// A finished archive that has not been placed in the store yet.
///
/// Dropping it deletes the staging file.
#[derive(Debug)]
pub struct StagedArchive {
  file: NamedTempFile,
}

impl StagedArchive {
  pub fn path(&self) -> &Path {
    self.file.path()
  }

  pub(crate) fn into_temp_file(self) -> NamedTempFile {
    self.file
  }
}

/// Zip `output_dir` into a staging file under `staging_dir`.
///
/// Entry names are relative to `output_dir` with `/` separators; directories
/// get their own entries so empty directories survive a round trip.
pub fn create_archive(output_dir: &Path, staging_dir: &Path) -> Result<StagedArchive, ArchiveError> {
  if !output_dir.is_dir() {
    return Err(ArchiveError::MissingOutput(output_dir.to_path_buf()));
  }

  fs::create_dir_all(staging_dir).map_err(io_err(staging_dir))?;
  let mut staged = tempfile::Builder::new()
    .prefix(STAGING_PREFIX)
    .suffix(".zip.part")
    .tempfile_in(staging_dir)
    .map_err(io_err(staging_dir))?;
  let staged_path = staged.path().to_path_buf();

  info!(output = %output_dir.display(), staging = %staged_path.display(), "creating archive");

  let mut zip = ZipWriter::new(BufWriter::new(staged.as_file_mut()));
  let mut entries = 0usize;

  for entry in WalkDir::new(output_dir).min_depth(1).sort_by_file_name() {
    let entry = entry?;
    let path = entry.path();
    let name = entry_name(output_dir, path);
    let metadata = entry.metadata()?;
    let options = entry_options(&metadata);

    if metadata.is_dir() {
      zip.add_directory(format!("{name}/"), options).map_err(zip_err(path))?;
    } else if metadata.is_file() {
      zip
        .start_file(name.as_str(), options.large_file(metadata.len() >= LARGE_FILE_THRESHOLD))
        .map_err(zip_err(path))?;
      let mut source = File::open(path).map_err(io_err(path))?;
      io::copy(&mut source, &mut zip).map_err(io_err(path))?;
    } else {
      debug!(path = %path.display(), "skipping non-regular file");
      continue;
    }
    entries += 1;
  }

  let mut writer = zip.finish().map_err(zip_err(&staged_path))?;
  writer.flush().map_err(io_err(&staged_path))?;
  drop(writer);

  debug!(entries, path = %staged_path.display(), "archive written");
  Ok(StagedArchive { file: staged })
}

fn entry_options(metadata: &fs::Metadata) -> SimpleFileOptions {
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    options.unix_permissions(metadata.permissions().mode() & 0o7777)
  }

  #[cfg(not(unix))]
  {
    let _ = metadata;
    options
  }
}

fn entry_name(root: &Path, path: &Path) -> String {
  path
    .strip_prefix(root)
    .unwrap_or(path)
    .components()
    .filter_map(|c| match c {
      Component::Normal(part) => Some(part.to_string_lossy()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/")
}

/// Replace `output_dir` with the contents of `archive`.
///
/// Returns the number of entries extracted. The previous output directory is
/// moved aside before the swap and put back if the swap fails, so on error it
/// is still in place.
pub fn extract_archive(archive: &Path, output_dir: &Path) -> Result<usize, ArchiveError> {
  let file = File::open(archive).map_err(io_err(archive))?;
  let mut zip = ZipArchive::new(BufReader::new(file)).map_err(zip_err(archive))?;

  let parent = match output_dir.parent() {
    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
    _ => PathBuf::from("."),
  };
  fs::create_dir_all(&parent).map_err(io_err(&parent))?;

  let staging = tempfile::Builder::new()
    .prefix(".hashibuild-extract-")
    .tempdir_in(&parent)
    .map_err(io_err(&parent))?;

  info!(archive = %archive.display(), output = %output_dir.display(), "extracting archive");
  let count = unpack(&mut zip, archive, staging.path())?;

  let previous = if output_dir.exists() {
    let holder = tempfile::Builder::new()
      .prefix(".hashibuild-previous-")
      .tempdir_in(&parent)
      .map_err(io_err(&parent))?;
    let moved = holder.path().join("output");
    fs::rename(output_dir, &moved).map_err(io_err(output_dir))?;
    Some((holder, moved))
  } else {
    None
  };

  if let Err(source) = fs::rename(staging.path(), output_dir) {
    if let Some((_, moved)) = &previous
      && let Err(restore) = fs::rename(moved, output_dir)
    {
      warn!(output = %output_dir.display(), error = %restore, "failed to restore previous output directory");
    }
    return Err(ArchiveError::Io {
      path: output_dir.to_path_buf(),
      source,
    });
  }
  drop(previous);

  debug!(entries = count, "archive extracted");
  Ok(count)
}

fn unpack<R: Read + Seek>(zip: &mut ZipArchive<R>, archive: &Path, dest: &Path) -> Result<usize, ArchiveError> {
  for i in 0..zip.len() {
    let mut entry = zip.by_index(i).map_err(zip_err(archive))?;
    let relative = entry
      .enclosed_name()
      .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_string()))?;
    let dest_path = dest.join(relative);

    if entry.is_dir() {
      fs::create_dir_all(&dest_path).map_err(io_err(&dest_path))?;
      continue;
    }

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let mut out = File::create(&dest_path).map_err(io_err(&dest_path))?;
    io::copy(&mut entry, &mut out).map_err(io_err(&dest_path))?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode() {
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode & 0o7777)).map_err(io_err(&dest_path))?;
      }
    }
  }

  Ok(zip.len())
}

/// Entry names of an archive, in archive order.
pub fn list_entries(archive: &Path) -> Result<Vec<String>, ArchiveError> {
  let file = File::open(archive).map_err(io_err(archive))?;
  let mut zip = ZipArchive::new(BufReader::new(file)).map_err(zip_err(archive))?;

  let mut names = Vec::with_capacity(zip.len());
  for i in 0..zip.len() {
    let entry = zip.by_index(i).map_err(zip_err(archive))?;
    names.push(entry.name().to_string());
  }
  Ok(names)
}

/// Check that `bytes` parse as a zip archive; returns the entry count.
pub fn validate_bytes(bytes: &[u8]) -> Result<usize, ArchiveError> {
  let zip = ZipArchive::new(Cursor::new(bytes)).map_err(ArchiveError::Malformed)?;
  Ok(zip.len())
}
