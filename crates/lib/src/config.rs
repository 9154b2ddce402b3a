//! Project descriptor and process settings.
//!
//! `ProjectConfig` is the JSON descriptor passed with `--config`. `Settings`
//! carries everything that would otherwise be read from the process
//! environment; it is built once at the CLI boundary and passed down, so no
//! component reads environment variables itself.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{ENV_ARCHIVE, ENV_ARCHIVE_REMOTE, ENV_UPLOADER};

/// Errors in the project descriptor or the project tree it points at.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid project name '{0}': use only letters, digits, '.', '_' and '-', and do not start with '.'")]
  InvalidName(String),

  #[error("config field '{0}' must not be empty")]
  EmptyField(&'static str),

  #[error("input root does not exist or is not a directory: {0}")]
  RootNotFound(PathBuf),

  #[error("input path does not exist: {0}")]
  InputNotFound(PathBuf),

  #[error("invalid ignore pattern '{pattern}': {source}")]
  InvalidIgnore {
    pattern: String,
    #[source]
    source: globset::Error,
  },
}

/// A project descriptor.
///
/// Keys are PascalCase in JSON:
///
/// ```json
/// {
///   "Name": "hashibuildtest",
///   "InputRoot": "test/prj",
///   "InputPaths": [],
///   "OutputDir": "test/out",
///   "BuildCmd": "./build.sh",
///   "Ignores": ["ignored.txt"]
/// }
/// ```
///
/// Relative paths are interpreted against the process working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectConfig {
  pub name: String,
  pub input_root: PathBuf,
  /// Sub-paths of `input_root` to include; empty means the whole root.
  #[serde(default)]
  pub input_paths: Vec<String>,
  pub output_dir: PathBuf,
  pub build_cmd: String,
  #[serde(default)]
  pub ignores: Vec<String>,
}

impl ProjectConfig {
  /// Read, parse and validate a descriptor file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let config: ProjectConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    config.validate()?;
    debug!(name = %config.name, root = %config.input_root.display(), "loaded project config");
    Ok(config)
  }

  /// Check the fields that must hold before any filesystem work starts.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !is_safe_name(&self.name) {
      return Err(ConfigError::InvalidName(self.name.clone()));
    }
    if self.input_root.as_os_str().is_empty() {
      return Err(ConfigError::EmptyField("InputRoot"));
    }
    if self.output_dir.as_os_str().is_empty() {
      return Err(ConfigError::EmptyField("OutputDir"));
    }
    if self.build_cmd.trim().is_empty() {
      return Err(ConfigError::EmptyField("BuildCmd"));
    }
    Ok(())
  }
}

/// Whether `name` can be embedded verbatim in an archive filename.
pub fn is_safe_name(name: &str) -> bool {
  !name.is_empty()
    && !name.starts_with('.')
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Process-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
  /// Local archive store; `None` disables archiving and caching.
  pub archive_dir: Option<PathBuf>,
  /// Uploader command template containing `[ZIP]`.
  pub uploader: Option<String>,
  /// Remote URL template containing `[ZIP]`.
  pub remote: Option<String>,
}

impl Settings {
  /// Read `HASHIBUILD_ARCHIVE`, `HASHIBUILD_UPLOADER` and
  /// `HASHIBUILD_ARCHIVE_REMOTE`.
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build settings from an arbitrary key lookup. Empty values count as unset.
  pub fn from_lookup<F>(lookup: F) -> Self
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    Self {
      archive_dir: get(ENV_ARCHIVE).map(PathBuf::from),
      uploader: get(ENV_UPLOADER),
      remote: get(ENV_ARCHIVE_REMOTE),
    }
  }
}
