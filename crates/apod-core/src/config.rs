use apod_api::{RetryConfig, Upstream};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "apod-explorer";

/// Main configuration structure
///
/// Loaded from `config.toml` in the platform config directory; CLI flags
/// override individual fields afterwards. Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load config from default location, or defaults if there's no file yet
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the config file path (XDG on Linux, Application Support on macOS, AppData on Windows)
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join(APP_DIR);

        Ok(config_dir.join("config.toml"))
    }

    /// Where favorites live, unless overridden in `[storage]`
    pub fn data_dir(&self) -> crate::Result<PathBuf> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))
    }

    /// SQLite cache file, unless overridden in `[cache]`
    pub fn cache_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.cache.path {
            return Ok(path.clone());
        }
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR).join("entries.db"))
            .ok_or_else(|| crate::Error::ConfigError("Could not find cache directory".into()))
    }
}

/// Which API the client talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiFlavor {
    /// NASA's planetary/apod endpoint directly
    #[default]
    Nasa,
    /// An explorer proxy exposing /today, ?date= and /range
    Proxy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub flavor: ApiFlavor,

    /// Base URL; defaults to NASA's endpoint for the nasa flavor.
    /// Required for the proxy flavor.
    #[serde(default)]
    pub base_url: Option<String>,

    /// NASA API key. Get one at https://api.nasa.gov
    /// DEMO_KEY works but is heavily rate limited.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    3
}

pub const DEMO_API_KEY: &str = "DEMO_KEY";
pub const DEFAULT_PROXY_URL: &str = "http://localhost:8080/api/apod";

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            flavor: ApiFlavor::default(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl ApiConfig {
    pub fn upstream(&self) -> Upstream {
        match self.flavor {
            ApiFlavor::Nasa => {
                let mut upstream = Upstream::nasa(self.api_key.as_deref().unwrap_or(DEMO_API_KEY));
                if let (Upstream::Nasa { base_url, .. }, Some(custom)) = (&mut upstream, &self.base_url) {
                    *base_url = custom.clone();
                }
                upstream
            }
            ApiFlavor::Proxy => Upstream::proxy(
                self.base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PROXY_URL.to_string()),
            ),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            ..RetryConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// How long today's entry is reused before asking again
    #[serde(default = "default_today_ttl")]
    pub today_ttl_hours: u64,

    /// Override for the SQLite file location
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_today_ttl() -> u64 {
    6 // a new picture goes up once a day; checking a few times is plenty
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            today_ttl_hours: default_today_ttl(),
            path: None,
        }
    }
}

impl CacheConfig {
    pub fn today_ttl(&self) -> Duration {
        Duration::from_secs(self.today_ttl_hours.saturating_mul(3600))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for where favorites are kept
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// How many days back the gallery reaches
    #[serde(default = "default_gallery_days")]
    pub gallery_days: u32,
}

fn default_gallery_days() -> u32 {
    30
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            gallery_days: default_gallery_days(),
        }
    }
}
