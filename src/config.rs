use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `data_dir`.
pub const DATA_DIR_ENV: &str = "LOCALSTASH_DATA_DIR";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Directory holding both database files (defaults to the platform data dir)
  pub data_dir: Option<PathBuf>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
  /// Set from the command line; beats both the environment and the file
  #[serde(skip)]
  pub data_dir_override: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// TTL for cache entries stored without an explicit one
  #[serde(default = "default_ttl_secs")]
  pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      default_ttl_secs: default_ttl_secs(),
    }
  }
}

fn default_ttl_secs() -> u64 {
  60 * 60
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter used when RUST_LOG is unset, e.g. "info" or "localstash=debug"
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Log file path (defaults to localstash.log inside the data dir)
  pub file: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./localstash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/localstash/config.yaml
  ///
  /// Without any file the defaults apply.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("localstash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("localstash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file parses as null; treat it as all defaults.
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Directory for the database files.
  ///
  /// Precedence: command line, `LOCALSTASH_DATA_DIR`, config file, platform default.
  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.data_dir_override {
      return Ok(dir.clone());
    }

    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
      if !dir.is_empty() {
        return Ok(PathBuf::from(dir));
      }
    }

    if let Some(dir) = &self.data_dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("localstash"))
  }

  pub fn default_ttl(&self) -> Duration {
    Duration::from_secs(self.cache.default_ttl_secs)
  }

  pub fn log_file(&self) -> Result<PathBuf> {
    match &self.log.file {
      Some(file) => Ok(file.clone()),
      None => Ok(self.data_dir()?.join("localstash.log")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.default_ttl(), Duration::from_secs(3600));
    assert_eq!(config.log.level, "info");
    assert!(config.data_dir.is_none());
  }

  #[test]
  fn test_parse_partial_yaml() {
    let config = Config::from_yaml(
      "data_dir: /tmp/stash\ncache:\n  default_ttl_secs: 120\n",
    )
    .unwrap();
    assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/stash")));
    assert_eq!(config.default_ttl(), Duration::from_secs(120));
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_empty_file_is_default() {
    let config = Config::from_yaml("  \n").unwrap();
    assert_eq!(config.cache.default_ttl_secs, 3600);
  }

  #[test]
  fn test_override_beats_file_value() {
    let config = Config {
      data_dir: Some(PathBuf::from("/from/file")),
      data_dir_override: Some(PathBuf::from("/from/cli")),
      ..Config::default()
    };
    assert_eq!(config.data_dir().unwrap(), PathBuf::from("/from/cli"));
    assert_eq!(
      config.log_file().unwrap(),
      PathBuf::from("/from/cli/localstash.log")
    );
  }

  #[test]
  fn test_load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "log:\n  level: debug\n  file: /tmp/stash.log\n").unwrap();

    let config = Config::load(Some(path.as_path())).unwrap();
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.log_file().unwrap(), PathBuf::from("/tmp/stash.log"));
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(dir.path().join("nope.yaml").as_path())).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
