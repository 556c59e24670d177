//! Data and configuration directories.
//!
//! Resolution order for each directory:
//! 1. `QSYNC_DATA_DIR` / `QSYNC_CONFIG_DIR`
//! 2. `XDG_DATA_HOME` / `XDG_CONFIG_HOME` (Unix) or `APPDATA` (Windows), joined with the app name
//! 3. Home directory fallbacks

use std::env;
use std::path::PathBuf;

use crate::consts::APP_NAME;

pub const DATA_DIR_ENV: &str = "QSYNC_DATA_DIR";
pub const CONFIG_DIR_ENV: &str = "QSYNC_CONFIG_DIR";

const CONFIG_FILENAME: &str = "config.toml";
const SNAPSHOTS_DIR: &str = "snapshots";

fn env_path(var: &str) -> Option<PathBuf> {
  env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the user's home directory, or the current directory if it cannot be determined.
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  env_path("USERPROFILE").unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the user's home directory, or the current directory if it cannot be determined.
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  env_path("HOME").unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(windows)]
fn default_config_dir() -> PathBuf {
  env_path("APPDATA")
    .unwrap_or_else(|| home_dir().join("AppData").join("Roaming"))
    .join(APP_NAME)
}

#[cfg(not(windows))]
fn default_config_dir() -> PathBuf {
  env_path("XDG_CONFIG_HOME")
    .unwrap_or_else(|| home_dir().join(".config"))
    .join(APP_NAME)
}

#[cfg(windows)]
fn default_data_dir() -> PathBuf {
  env_path("APPDATA")
    .unwrap_or_else(|| home_dir().join("AppData").join("Roaming"))
    .join(APP_NAME)
}

#[cfg(not(windows))]
fn default_data_dir() -> PathBuf {
  env_path("XDG_DATA_HOME")
    .unwrap_or_else(|| home_dir().join(".local").join("share"))
    .join(APP_NAME)
}

/// Returns the directory for configuration files.
pub fn config_dir() -> PathBuf {
  env_path(CONFIG_DIR_ENV).unwrap_or_else(default_config_dir)
}

/// Returns the directory for persisted state (snapshots, lock file).
pub fn data_dir() -> PathBuf {
  env_path(DATA_DIR_ENV).unwrap_or_else(default_data_dir)
}

/// Returns the default configuration file path.
pub fn config_file() -> PathBuf {
  config_dir().join(CONFIG_FILENAME)
}

/// Returns the snapshot store directory.
pub fn snapshots_dir() -> PathBuf {
  data_dir().join(SNAPSHOTS_DIR)
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn explicit_overrides_win() {
    temp_env::with_vars(
      [
        (DATA_DIR_ENV, Some("/custom/data")),
        (CONFIG_DIR_ENV, Some("/custom/config")),
        ("XDG_DATA_HOME", Some("/xdg/data")),
        ("XDG_CONFIG_HOME", Some("/xdg/config")),
      ],
      || {
        assert_eq!(data_dir(), PathBuf::from("/custom/data"));
        assert_eq!(config_dir(), PathBuf::from("/custom/config"));
        assert_eq!(snapshots_dir(), PathBuf::from("/custom/data/snapshots"));
        assert_eq!(config_file(), PathBuf::from("/custom/config/config.toml"));
      },
    );
  }

  #[test]
  #[serial]
  fn xdg_takes_precedence_over_home() {
    temp_env::with_vars(
      [
        (DATA_DIR_ENV, None::<&str>),
        (CONFIG_DIR_ENV, None::<&str>),
        ("XDG_DATA_HOME", Some("/xdg/data")),
        ("XDG_CONFIG_HOME", Some("/xdg/config")),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(data_dir(), PathBuf::from("/xdg/data").join(APP_NAME));
        assert_eq!(config_dir(), PathBuf::from("/xdg/config").join(APP_NAME));
      },
    );
  }

  #[test]
  #[serial]
  fn fallback_to_home_directories() {
    temp_env::with_vars(
      [
        (DATA_DIR_ENV, None::<&str>),
        (CONFIG_DIR_ENV, Some("")),
        ("XDG_DATA_HOME", None::<&str>),
        ("XDG_CONFIG_HOME", None::<&str>),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(data_dir(), PathBuf::from("/home/user/.local/share").join(APP_NAME));
        assert_eq!(config_dir(), PathBuf::from("/home/user/.config").join(APP_NAME));
      },
    );
  }
}
