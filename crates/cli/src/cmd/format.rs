use std::fs;
use std::ops::Range;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::debug;

use qsync_lib::config::SyncConfig;
use qsync_lib::formatter::{BuildFileFormatter, BuildFileType, apply_replacements};

use crate::output::print_success;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FileTypeArg {
  Build,
  Bzl,
}

impl From<FileTypeArg> for BuildFileType {
  fn from(arg: FileTypeArg) -> Self {
    match arg {
      FileTypeArg::Build => BuildFileType::Build,
      FileTypeArg::Bzl => BuildFileType::Bzl,
    }
  }
}

#[derive(Args, Debug)]
pub struct FormatArgs {
  /// BUILD or .bzl file to format
  pub file: PathBuf,

  /// File type (inferred from the file name when omitted)
  #[arg(long = "type", value_enum)]
  pub file_type: Option<FileTypeArg>,

  /// Only format this byte range (START:END, repeatable)
  #[arg(long = "range", value_parser = parse_range)]
  pub ranges: Vec<Range<usize>>,

  /// Write the result back to the file instead of printing it
  #[arg(short, long)]
  pub write: bool,

  /// Working directory for the formatter process
  #[arg(long)]
  pub execution_root: Option<PathBuf>,
}

pub fn cmd_format(args: FormatArgs, config: &SyncConfig) -> Result<()> {
  let path = dunce::canonicalize(&args.file).with_context(|| format!("{} not found", args.file.display()))?;
  let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
  let file_type = args
    .file_type
    .map(BuildFileType::from)
    .unwrap_or_else(|| BuildFileType::from_path(&path));

  let mut formatter = BuildFileFormatter::locate(config)?;
  if let Some(root) = &args.execution_root {
    formatter = formatter.with_execution_root(root);
  }
  debug!(file = %path.display(), %file_type, ranges = args.ranges.len(), "formatting");

  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to start async runtime")?;

  let formatted = runtime.block_on(async {
    if args.ranges.is_empty() {
      formatter.format(&text, file_type).await
    } else {
      let replacements = formatter.replacements(&text, &args.ranges, file_type).await?;
      Ok(apply_replacements(&text, &replacements))
    }
  })?;

  if args.write {
    if formatted == text {
      print_success(&format!("{} already formatted", path.display()));
    } else {
      fs::write(&path, &formatted).with_context(|| format!("Failed to write {}", path.display()))?;
      print_success(&format!("Formatted {}", path.display()));
    }
  } else {
    print!("{}", formatted);
  }

  Ok(())
}

fn parse_range(value: &str) -> Result<Range<usize>, String> {
  let (start, end) = value
    .split_once(':')
    .ok_or_else(|| format!("expected START:END, got `{}`", value))?;
  let start: usize = start.trim().parse().map_err(|e| format!("invalid start: {}", e))?;
  let end: usize = end.trim().parse().map_err(|e| format!("invalid end: {}", e))?;
  if start > end {
    return Err(format!("start {} is after end {}", start, end));
  }
  Ok(start..end)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn range_parsing() {
    assert_eq!(parse_range("3:10"), Ok(3..10));
    assert_eq!(parse_range("0:0"), Ok(0..0));
    assert!(parse_range("10:3").is_err());
    assert!(parse_range("7").is_err());
    assert!(parse_range("a:3").is_err());
  }
}
