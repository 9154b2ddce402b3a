//! `--manifest` and `--treehash`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use hashibuild_lib::config::ProjectConfig;
use hashibuild_lib::fingerprint::{Fingerprint, fingerprint};
use hashibuild_lib::manifest::{Manifest, ManifestEntry, build_manifest, tree_manifest};

use crate::output::{OutputFormat, print_json, print_manifest_entry};

#[derive(Serialize)]
struct ManifestReport<'a> {
  root: &'a Path,
  fingerprint: &'a Fingerprint,
  files: &'a [ManifestEntry],
}

/// Print the manifest of the configured project.
pub fn cmd_manifest(config: &ProjectConfig, verbose: bool, output: OutputFormat) -> Result<()> {
  let manifest = build_manifest(config).context("Failed to compute manifest")?;
  let total = fingerprint(&config.name, &manifest);
  report(&config.input_root, &manifest, &total, verbose, output)
}

/// Print the manifest of an arbitrary directory, with default ignores.
pub fn cmd_treehash(dir: &Path, verbose: bool, output: OutputFormat) -> Result<()> {
  let manifest = tree_manifest(dir).with_context(|| format!("Failed to compute manifest of {}", dir.display()))?;
  let total = fingerprint("", &manifest);
  report(dir, &manifest, &total, verbose, output)
}

fn report(root: &Path, manifest: &Manifest, total: &Fingerprint, verbose: bool, output: OutputFormat) -> Result<()> {
  if output.is_json() {
    return print_json(&ManifestReport {
      root,
      fingerprint: total,
      files: manifest.entries(),
    });
  }

  for entry in manifest.entries() {
    print_manifest_entry(entry, verbose);
  }
  if verbose {
    println!("Total: {}", total);
  }
  Ok(())
}
