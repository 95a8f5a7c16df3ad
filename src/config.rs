use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::feed::{CacheLimits, FEED_MAX_ITEMS, VISITED_MAX_ITEMS};

/// Environment variable overriding `api.url`.
const API_URL_ENV: &str = "CULINA_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub cache: CacheConfig,
  pub feed: FeedConfig,
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Server root, without the `/api/{version}` suffix
  pub url: String,
  pub version: String,
  /// Page size sent as `limit`; the server default applies when unset
  pub page_limit: Option<u32>,
  /// Request timeout. No timeout when unset.
  pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: "http://localhost:8080".to_string(),
      version: "v2".to_string(),
      page_limit: None,
      timeout_secs: None,
    }
  }
}

impl ApiConfig {
  /// Versioned API root, e.g. `http://localhost:8080/api/v2`.
  pub fn base_url(&self) -> String {
    format!("{}/api/{}", self.url.trim_end_matches('/'), self.version)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Store location (defaults to $XDG_DATA_HOME/culina/store.db)
  pub path: Option<PathBuf>,
  /// Total bytes the store may hold
  pub quota_bytes: usize,
  pub feed_max_items: usize,
  pub visited_max_items: usize,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      path: None,
      quota_bytes: 5 * 1024 * 1024,
      feed_max_items: FEED_MAX_ITEMS,
      visited_max_items: VISITED_MAX_ITEMS,
    }
  }
}

impl CacheConfig {
  pub fn limits(&self) -> CacheLimits {
    CacheLimits {
      feed_max_items: self.feed_max_items,
      visited_max_items: self.visited_max_items,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
  /// Delay before a still-loading feed is reported as slow
  pub slow_load_ms: u64,
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self { slow_load_ms: 3000 }
  }
}

impl FeedConfig {
  pub fn slow_load_after(&self) -> Duration {
    Duration::from_millis(self.slow_load_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Filter directive used when RUST_LOG is not set
  pub level: String,
  /// Log directory (defaults to $XDG_DATA_HOME/culina/logs)
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./culina.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/culina/config.yaml
  ///
  /// Without a config file the built-in defaults are used. `CULINA_API_URL`
  /// overrides `api.url` in every case.
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

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    Ok(config.with_env_overrides(std::env::var(API_URL_ENV).ok()))
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("culina.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("culina").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  fn with_env_overrides(mut self, api_url: Option<String>) -> Self {
    if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
      self.api.url = url;
    }
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url(), "http://localhost:8080/api/v2");
    assert_eq!(config.cache.quota_bytes, 5 * 1024 * 1024);
    assert_eq!(config.cache.limits(), CacheLimits::default());
    assert_eq!(config.feed.slow_load_after(), Duration::from_millis(3000));
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::parse(
      r#"
api:
  url: https://recipes.example.com/
  page_limit: 12
cache:
  feed_max_items: 60
"#,
    )
    .unwrap();

    assert_eq!(config.api.base_url(), "https://recipes.example.com/api/v2");
    assert_eq!(config.api.page_limit, Some(12));
    assert_eq!(config.cache.feed_max_items, 60);
    assert_eq!(config.cache.visited_max_items, VISITED_MAX_ITEMS);
    assert_eq!(config.logging.level, "info");
  }

  #[test]
  fn test_empty_file_is_default() {
    let config = Config::parse("  \n").unwrap();
    assert_eq!(config.api.url, "http://localhost:8080");
  }

  #[test]
  fn test_env_override() {
    let config = Config::default().with_env_overrides(Some("http://10.0.0.2:9000".to_string()));
    assert_eq!(config.api.base_url(), "http://10.0.0.2:9000/api/v2");

    let config = Config::default().with_env_overrides(Some(String::new()));
    assert_eq!(config.api.url, "http://localhost:8080");
  }

  #[test]
  fn test_explicit_missing_path_is_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(Some(&dir.path().join("nope.yaml"))).is_err());
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("culina.yaml");
    std::fs::write(&path, "feed:\n  slow_load_ms: 500\n").unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.feed.slow_load_ms, 500);
  }
}
