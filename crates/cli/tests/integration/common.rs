//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const PROJECT_NAME: &str = "hashibuildtest";

/// Copies `subdir/testfile.txt` into the output directory and appends a line
/// to `build.log` so tests can count how often the build ran.
#[cfg(unix)]
pub const BUILD_CMD: &str = "mkdir -p ../out && cp subdir/testfile.txt ../out/testfile.txt && echo built >> ../build.log";
#[cfg(windows)]
pub const BUILD_CMD: &str =
  r"(if not exist ..\out mkdir ..\out) && copy /Y subdir\testfile.txt ..\out\testfile.txt >NUL && echo built>> ..\build.log";

/// Isolated project layout:
///
/// ```text
/// <temp>/
/// ├── testprj.json
/// ├── prj/
/// │   ├── buildsomething.cmd
/// │   ├── ignored.txt
/// │   └── subdir/testfile.txt
/// ├── out/        (build output)
/// └── archives/   (HASHIBUILD_ARCHIVE, when enabled)
/// ```
pub struct TestEnv {
  pub temp: TempDir,
  pub config_path: PathBuf,
}

impl TestEnv {
  pub fn new() -> Self {
    Self::with_build_cmd(BUILD_CMD)
  }

  pub fn with_build_cmd(build_cmd: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self {
      config_path: temp.path().join("testprj.json"),
      temp,
    };

    env.write_file("prj/buildsomething.cmd", "echo building\n");
    env.write_file("prj/subdir/testfile.txt", "test content\n");
    env.write_file("prj/ignored.txt", "not part of the manifest\n");

    let config = serde_json::json!({
      "Name": PROJECT_NAME,
      "InputRoot": "prj",
      "InputPaths": [],
      "OutputDir": "out",
      "BuildCmd": build_cmd,
      "Ignores": ["ignored.txt"],
    });
    std::fs::write(&env.config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    env
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn archive_dir(&self) -> PathBuf {
    self.temp.path().join("archives")
  }

  pub fn output_dir(&self) -> PathBuf {
    self.temp.path().join("out")
  }

  /// File names in the archive directory (empty if it does not exist).
  pub fn archive_files(&self) -> Vec<String> {
    match std::fs::read_dir(self.archive_dir()) {
      Ok(entries) => entries
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect(),
      Err(_) => Vec::new(),
    }
  }

  /// How many times the build command ran.
  pub fn build_count(&self) -> usize {
    std::fs::read_to_string(self.temp.path().join("build.log"))
      .map(|log| log.lines().count())
      .unwrap_or(0)
  }

  /// The hashibuild binary, run from the temp dir with no archive settings.
  pub fn cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("hashibuild");
    cmd.current_dir(self.temp.path());
    cmd.env_remove("HASHIBUILD_ARCHIVE");
    cmd.env_remove("HASHIBUILD_UPLOADER");
    cmd.env_remove("HASHIBUILD_ARCHIVE_REMOTE");
    cmd.env_remove("RUST_LOG");
    cmd
  }

  /// Like `cmd`, with `HASHIBUILD_ARCHIVE` pointing at `archive_dir`.
  pub fn archived_cmd(&self) -> Command {
    let mut cmd = self.cmd();
    cmd.env("HASHIBUILD_ARCHIVE", self.archive_dir());
    cmd
  }

  pub fn build(&self) -> Command {
    let mut cmd = self.archived_cmd();
    cmd.arg("--config").arg(&self.config_path).arg("--build");
    cmd
  }
}
