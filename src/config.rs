use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::sync::SyncPolicy;

pub const DEFAULT_API_URL: &str = "https://609a908e0f5a13001721b74e.mockapi.io/picpay/api/users";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub sync: SyncConfig,
  #[serde(default)]
  pub connectivity: ConnectivityConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Endpoint returning the JSON user list
  #[serde(default = "default_api_url")]
  pub url: String,
  #[serde(default = "default_api_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      timeout_secs: default_api_timeout_secs(),
    }
  }
}

fn default_api_url() -> String {
  DEFAULT_API_URL.to_string()
}

fn default_api_timeout_secs() -> u64 {
  10
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
  /// connectivity_gated or cache_first
  #[serde(default)]
  pub policy: SyncPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
  /// Host to probe (defaults to the API host)
  pub host: Option<String>,
  /// Port to probe (defaults to the API port)
  pub port: Option<u16>,
  #[serde(default = "default_probe_timeout_ms")]
  pub timeout_ms: u64,
}

impl Default for ConnectivityConfig {
  fn default() -> Self {
    Self {
      host: None,
      port: None,
      timeout_ms: default_probe_timeout_ms(),
    }
  }
}

fn default_probe_timeout_ms() -> u64 {
  1500
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// SQLite file (default: $XDG_DATA_HOME/roster/cache.db)
  pub path: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./roster.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/roster/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
  /// `ROSTER_API_URL` overrides `api.url` either way.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    if let Ok(url) = std::env::var("ROSTER_API_URL") {
      config.api.url = url;
    }

    // Fail early on a bad URL rather than on first refresh
    config.api_url()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("roster.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("roster").join("config.yaml");
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

  pub fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file deserializes to unit, not to an empty mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  pub fn api_url(&self) -> Result<Url> {
    Url::parse(&self.api.url).map_err(|e| eyre!("Invalid api.url {:?}: {}", self.api.url, e))
  }

  /// Host and port the connectivity probe should dial.
  pub fn probe_target(&self) -> Result<(String, u16)> {
    let url = self.api_url()?;

    let host = match &self.connectivity.host {
      Some(h) => h.clone(),
      None => url
        .host_str()
        .map(String::from)
        .ok_or_else(|| eyre!("api.url has no host: {}", url))?,
    };

    let port = match self.connectivity.port {
      Some(p) => p,
      None => url
        .port_or_known_default()
        .ok_or_else(|| eyre!("api.url has no port: {}", url))?,
    };

    Ok((host, port))
  }

  pub fn probe_timeout(&self) -> Duration {
    Duration::from_millis(self.connectivity.timeout_ms)
  }

  /// Directory for the log file, next to the cache.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("roster"))
  }
}
