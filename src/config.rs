use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Service configuration.
///
/// Every field has a built-in default, so the config file is optional;
/// a missing file just means the stock JMA upstream and a local bind
/// address.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub server: ServerConfig,
  pub upstream: UpstreamConfig,
  pub resolver: FallbackConfig,
  pub cache: CacheConfig,
  pub default_station: DefaultStation,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  /// Bind address, e.g. "0.0.0.0:8700"
  pub bind: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: "127.0.0.1:8700".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
  /// Base URL for timestamped snapshot documents
  pub base_url: String,
  /// Per-request timeout in seconds
  pub timeout_secs: u64,
  /// Publication cadence in minutes; must divide an hour evenly
  pub cadence_minutes: u32,
  /// Source time zone as a constant UTC offset (JST = +9)
  pub utc_offset_hours: i32,
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      base_url: "https://www.jma.go.jp/bosai/amedas/data/map".to_string(),
      timeout_secs: 10,
      cadence_minutes: 10,
      utc_offset_hours: 9,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
  /// How many cadence periods to retreat before giving up
  pub max_fallback: u32,
  /// Always probe the freshest boundary live instead of trusting the cache
  pub refresh_latest: bool,
}

impl Default for FallbackConfig {
  fn default() -> Self {
    Self {
      max_fallback: 5,
      refresh_latest: false,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  /// Lifetime of a cached snapshot; stable within its publication window
  pub positive_ttl_secs: u64,
  /// Lifetime of a "not yet published" marker; short so a late
  /// publication is picked up quickly
  pub negative_ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      positive_ttl_secs: 60,
      negative_ttl_secs: 10,
    }
  }
}

/// Station served when a request names none (the original deployment's
/// home station).
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct DefaultStation(pub String);

impl Default for DefaultStation {
  fn default() -> Self {
    Self("46106".to_string())
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// tracing env-filter directive; RUST_LOG overrides it
  pub filter: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      filter: "amedasd=info".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./amedasd.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/amedasd/config.yaml
  ///
  /// Falls back to built-in defaults when no file exists.
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
    let local = PathBuf::from("amedasd.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("amedasd").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}
