mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use qsync_lib::config::SyncConfig;
use tracing_subscriber::EnvFilter;

use crate::cmd::{FormatArgs, SnapshotCommand, SyncArgs};
use crate::output::{OutputFormat, print_error};

/// qsync - incremental project model sync from build aspect output
#[derive(Parser)]
#[command(name = "qsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  /// Config file (default: {config_dir}/config.toml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one sync pass over the aspect output and commit a snapshot
  Sync(SyncArgs),

  /// Show the current snapshot
  Status {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Manage stored snapshots
  #[command(subcommand)]
  Snapshot(SnapshotCommand),

  /// Format a BUILD or .bzl file with the external formatter
  Format(FormatArgs),
}

fn init_tracing(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<()> {
  let config = SyncConfig::load_or_default(cli.config.as_deref())?;

  match cli.command {
    Commands::Sync(args) => cmd::cmd_sync(args, &config),
    Commands::Status { output } => cmd::cmd_status(output),
    Commands::Snapshot(command) => cmd::cmd_snapshot(command),
    Commands::Format(args) => cmd::cmd_format(args, &config),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
