//! Terminal output helpers shared by the qsync commands.
//!
//! Status lines go to stdout, warnings and errors to stderr. Colors are only
//! emitted when the target stream supports them.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream, Style};

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

#[derive(Clone, Copy)]
enum Level {
  Success,
  Info,
  Warning,
  Error,
}

impl Level {
  fn symbol(self) -> &'static str {
    match self {
      Level::Success => "✓",
      Level::Info => "•",
      Level::Warning => "⚠",
      Level::Error => "✗",
    }
  }

  fn style(self) -> Style {
    match self {
      Level::Success => Style::new().green(),
      Level::Info => Style::new().blue(),
      Level::Warning => Style::new().yellow(),
      Level::Error => Style::new().red(),
    }
  }

  fn stream(self) -> Stream {
    match self {
      Level::Success | Level::Info => Stream::Stdout,
      Level::Warning | Level::Error => Stream::Stderr,
    }
  }

  /// Whether the message text takes the level color too, not just the symbol.
  fn colors_message(self) -> bool {
    matches!(self, Level::Warning | Level::Error)
  }
}

fn print_line(level: Level, message: &str) {
  let stream = level.stream();
  let style = level.style();
  let symbol_text = level.symbol();
  let symbol = symbol_text.if_supports_color(stream, |s| s.style(style));
  let line = if level.colors_message() {
    format!("{} {}", symbol, message.if_supports_color(stream, |s| s.style(style)))
  } else {
    format!("{} {}", symbol, message)
  };

  match stream {
    Stream::Stderr => eprintln!("{}", line),
    _ => println!("{}", line),
  }
}

pub fn print_success(message: &str) {
  print_line(Level::Success, message);
}

pub fn print_info(message: &str) {
  print_line(Level::Info, message);
}

pub fn print_warning(message: &str) {
  print_line(Level::Warning, message);
}

pub fn print_error(message: &str) {
  print_line(Level::Error, message);
}

/// Indented `label: value` line.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// First 12 characters of a hex digest.
pub fn truncate_hash(hash: &str) -> &str {
  hash.get(..12).unwrap_or(hash)
}

/// Compact elapsed time: `50ms`, `1.50s`, `1m 5s`.
pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  match secs {
    0 => format!("{}ms", duration.subsec_millis()),
    1..60 => format!("{}.{:02}s", secs, duration.subsec_millis() / 10),
    _ => format!("{}m {}s", secs / 60, secs % 60),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn digest_truncation() {
    let digest = "3f5a9c0d1e2b4a6c8e0f1a2b3c4d5e6f";
    assert_eq!(truncate_hash(digest), "3f5a9c0d1e2b");
    assert_eq!(truncate_hash("short"), "short");
    assert_eq!(truncate_hash(""), "");
  }

  #[test]
  fn elapsed_formatting() {
    assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
    assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
  }
}
