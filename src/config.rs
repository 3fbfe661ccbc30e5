use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `api.base_url`
pub const API_URL_ENV: &str = "OPSDASH_API_URL";
/// Environment variable that supplies the public form access key
pub const FORM_KEY_ENV: &str = "OPSDASH_FORM_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  pub public_form: Option<PublicFormConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the REST backend, e.g. "https://ops.example.com/api"
  #[serde(default)]
  pub base_url: String,
  /// Path prefixes of third-party integration endpoints. A 401 under one of
  /// these means "not connected", not "signed out".
  #[serde(default = "default_integration_prefixes")]
  pub integration_prefixes: Vec<String>,
  pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: String::new(),
      integration_prefixes: default_integration_prefixes(),
      timeout_secs: None,
    }
  }
}

/// Where integration endpoints live unless configured otherwise
pub const DEFAULT_INTEGRATION_PREFIX: &str = "/integrations/";

fn default_integration_prefixes() -> Vec<String> {
  vec![DEFAULT_INTEGRATION_PREFIX.to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Age after which cached data is refetched even without invalidation.
  /// Unset means entries stay trusted until a write invalidates them.
  pub stale_secs: Option<u64>,
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  #[serde(default = "default_retry_base_ms")]
  pub retry_base_ms: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: None,
      max_retries: default_max_retries(),
      retry_base_ms: default_retry_base_ms(),
    }
  }
}

impl CacheConfig {
  pub fn stale_time(&self) -> Option<Duration> {
    self.stale_secs.map(Duration::from_secs)
  }

  pub fn retry_base(&self) -> Duration {
    Duration::from_millis(self.retry_base_ms)
  }
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_base_ms() -> u64 {
  1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublicFormConfig {
  pub access_key: String,
}

impl Config {
  /// Load configuration from file and environment.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./opsdash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/opsdash/config.yaml
  ///
  /// A config file is optional when `OPSDASH_API_URL` is set.
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
      None => Config::default(),
    };

    config
      .with_env_overrides(
        std::env::var(API_URL_ENV).ok(),
        std::env::var(FORM_KEY_ENV).ok(),
      )
      .validated()
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("opsdash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("opsdash").join("config.yaml");
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
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Apply environment-provided values on top of the file configuration.
  pub fn with_env_overrides(mut self, api_url: Option<String>, form_key: Option<String>) -> Self {
    if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
      self.api.base_url = url;
    }
    if let Some(key) = form_key.filter(|k| !k.trim().is_empty()) {
      self.public_form = Some(PublicFormConfig { access_key: key });
    }
    self
  }

  fn validated(self) -> Result<Self> {
    if self.api.base_url.trim().is_empty() {
      return Err(eyre!(
        "No API base URL configured. Set {} or api.base_url in ~/.config/opsdash/config.yaml",
        API_URL_ENV
      ));
    }
    url::Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid API base URL '{}': {}", self.api.base_url, e))?;
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let yaml = r#"
api:
  base_url: https://ops.example.com/api
  integration_prefixes: ["/integrations/", "/partners/"]
  timeout_secs: 10
cache:
  stale_secs: 30
  max_retries: 1
public_form:
  access_key: secret
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.api.base_url, "https://ops.example.com/api");
    assert_eq!(config.api.integration_prefixes.len(), 2);
    assert_eq!(config.cache.stale_time(), Some(Duration::from_secs(30)));
    assert_eq!(config.cache.max_retries, 1);
    assert_eq!(config.cache.retry_base_ms, 1000);
    assert_eq!(config.public_form.unwrap().access_key, "secret");
  }

  #[test]
  fn test_defaults() {
    let config = Config::from_yaml("api:\n  base_url: http://localhost:3000\n").unwrap();
    assert_eq!(config.api.integration_prefixes, vec!["/integrations/"]);
    assert_eq!(config.cache.stale_time(), None);
    assert_eq!(config.cache.max_retries, 3);
    assert!(config.public_form.is_none());
  }

  #[test]
  fn test_env_overrides_file() {
    let config = Config::from_yaml("api:\n  base_url: http://file\n")
      .unwrap()
      .with_env_overrides(Some("http://env".to_string()), Some("k".to_string()));
    assert_eq!(config.api.base_url, "http://env");
    assert_eq!(config.public_form.unwrap().access_key, "k");
  }

  #[test]
  fn test_missing_base_url_is_rejected() {
    let config = Config::default().with_env_overrides(None, None);
    assert!(config.validated().is_err());
  }
}
