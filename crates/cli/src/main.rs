mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use hashibuild_lib::config::{ProjectConfig, Settings};
use hashibuild_lib::vacuum::RetentionPolicy;

use crate::output::{OutputFormat, print_error};

/// Fingerprint a project, build it once, and reuse the zipped output.
#[derive(Parser)]
#[command(name = "hashibuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// JSON project descriptor
  #[arg(long, value_name = "PATH")]
  config: Option<PathBuf>,

  /// Print the project manifest (requires --config)
  #[arg(long, requires = "config")]
  manifest: bool,

  /// Restore the output from an archive, or run the build (requires --config)
  #[arg(long, requires = "config")]
  build: bool,

  /// Remove archives from HASHIBUILD_ARCHIVE
  #[arg(long)]
  vacuum: bool,

  /// With --vacuum: keep the N most recent archives
  #[arg(long, value_name = "N", requires = "vacuum", conflicts_with = "older_than")]
  keep: Option<usize>,

  /// With --vacuum: only remove archives older than this (e.g. 7d, 12h)
  #[arg(long, value_name = "DURATION", requires = "vacuum", value_parser = humantime::parse_duration)]
  older_than: Option<Duration>,

  /// With --vacuum: show what would be removed without removing it
  #[arg(long, requires = "vacuum")]
  dry_run: bool,

  /// Print the manifest of a directory (no config needed)
  #[arg(long, value_name = "DIR")]
  treehash: Option<PathBuf>,

  /// Output format
  #[arg(short, long, value_enum, default_value = "text")]
  output: OutputFormat,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,
}

impl Cli {
  fn retention_policy(&self) -> RetentionPolicy {
    match (self.keep, self.older_than) {
      (Some(n), _) => RetentionPolicy::KeepLatest(n),
      (None, Some(age)) => RetentionPolicy::OlderThan(age),
      (None, None) => RetentionPolicy::All,
    }
  }

  fn has_action(&self) -> bool {
    self.manifest || self.build || self.vacuum || self.treehash.is_some()
  }
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: &Cli) -> Result<()> {
  let settings = Settings::from_env();

  if let Some(dir) = &cli.treehash {
    cmd::cmd_treehash(dir, cli.verbose, cli.output)?;
  }

  if cli.manifest || cli.build {
    let path = cli.config.as_deref().context("--config is required")?;
    let config = ProjectConfig::load(path).context("Failed to load project config")?;

    if cli.manifest {
      cmd::cmd_manifest(&config, cli.verbose, cli.output)?;
    }
    if cli.build {
      cmd::cmd_build(&config, &settings, cli.verbose, cli.output)?;
    }
  }

  if cli.vacuum {
    cmd::cmd_vacuum(&settings, cli.retention_policy(), cli.dry_run, cli.output)?;
  }

  Ok(())
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  if !cli.has_action() {
    // Nothing to do: show usage.
    let _ = Cli::command().print_help();
    return ExitCode::SUCCESS;
  }

  match run(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
