//! `--vacuum`.

use std::time::Instant;

use anyhow::{Result, bail};

use hashibuild_lib::config::Settings;
use hashibuild_lib::consts::ENV_ARCHIVE;
use hashibuild_lib::store::ArchiveStore;
use hashibuild_lib::vacuum::{RetentionPolicy, vacuum};

use crate::output::{OutputFormat, human_elapsed, human_size, print_json, print_step, print_summary};

pub fn cmd_vacuum(settings: &Settings, policy: RetentionPolicy, dry_run: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let Some(archive_dir) = &settings.archive_dir else {
    bail!("No archive directory configured; set {}", ENV_ARCHIVE);
  };

  let store = ArchiveStore::new(archive_dir.clone());
  let result = vacuum(&store, policy, dry_run)?;

  if output.is_json() {
    return print_json(&result);
  }

  if dry_run {
    for path in &result.deleted_paths {
      print_step(&format!("Would remove {}", path.display()));
    }
  }

  let headline = if dry_run {
    "Dry run - no changes made"
  } else {
    "Vacuum complete!"
  };
  let mut rows = vec![
    ("Archives scanned", result.stats.archives_scanned.to_string()),
    ("Archives removed", result.stats.archives_deleted.to_string()),
  ];
  if result.stats.staging_deleted > 0 {
    rows.push(("Staging files removed", result.stats.staging_deleted.to_string()));
  }
  rows.push(("Space freed", human_size(result.stats.bytes_freed)));
  rows.push(("Duration", human_elapsed(start.elapsed())));
  print_summary(headline, &rows);

  Ok(())
}
