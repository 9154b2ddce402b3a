//! Terminal rendering for hashibuild.
//!
//! Progress lines and summaries go to stdout, warnings and errors to stderr.
//! Colour is applied only when the stream is a terminal, so piped manifests
//! stay plain `path` / `path hash` lines.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use hashibuild_lib::manifest::ManifestEntry;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// A pipeline step, e.g. `• Zipping out to archives/app-<fp>.zip`.
pub fn print_step(message: &str) {
  println!("{} {}", "•".if_supports_color(Stream::Stdout, |s| s.blue()), message);
}

/// A step that names an archive; the file name is highlighted, the directory
/// is not.
pub fn print_archive_step(verb: &str, archive: &Path, suffix: &str) {
  let file_name = archive
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  let dir = archive
    .parent()
    .map(|p| format!("{}{}", p.display(), std::path::MAIN_SEPARATOR))
    .unwrap_or_default();

  print_step(&format!(
    "{} {}{}{}",
    verb,
    dir.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    file_name.if_supports_color(Stream::Stdout, |s| s.cyan()),
    suffix
  ));
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    "⚠".if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    "✗".if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

/// Headline plus `label: value` rows with the values lined up.
pub fn print_summary(headline: &str, rows: &[(&str, String)]) {
  println!("{} {}", "✓".if_supports_color(Stream::Stdout, |s| s.green()), headline);

  let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
  for (label, value) in rows {
    let padded = format!("{label:<width$}");
    println!("  {}  {}", padded.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
  }
}

/// One manifest line: the path, and with `verbose` its content hash.
pub fn print_manifest_entry(entry: &ManifestEntry, verbose: bool) {
  if verbose {
    println!(
      "{} {}",
      entry.path,
      entry.hash.if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  } else {
    println!("{}", entry.path);
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let mut stdout = std::io::stdout().lock();
  serde_json::to_writer_pretty(&mut stdout, value).context("Failed to serialize to JSON")?;
  writeln!(stdout).context("Failed to write to stdout")?;
  Ok(())
}

/// Archive and store sizes in binary units.
pub fn human_size(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

  if bytes < 1024 {
    return format!("{bytes} B");
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }
  format!("{value:.1} {}", UNITS[unit])
}

/// Elapsed time rounded to milliseconds, e.g. `1s 250ms`.
pub fn human_elapsed(elapsed: Duration) -> String {
  let rounded = Duration::from_millis(elapsed.as_millis() as u64);
  humantime::format_duration(rounded).to_string()
}
