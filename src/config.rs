// Backend settings
// Loaded from ~/.config/shop-dashboard/config.toml, overridden by SHOPDASH_* env vars

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::gateway::PersistenceGateway;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::rest::RestGateway;
use crate::rollover::DEFAULT_PERIOD;

pub const ENV_URL: &str = "SHOPDASH_URL";
pub const ENV_ANON_KEY: &str = "SHOPDASH_ANON_KEY";
pub const ENV_SQLITE_PATH: &str = "SHOPDASH_SQLITE_PATH";
pub const ENV_TIMEOUT_SECS: &str = "SHOPDASH_TIMEOUT_SECS";
pub const ENV_ROLLOVER_SECS: &str = "SHOPDASH_ROLLOVER_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Hosted backend URL, e.g. https://xxxx.supabase.co
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    /// Local SQLite store, used when no hosted backend is configured
    pub sqlite_path: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub rollover_period_secs: Option<u64>,
    pub history_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Rest { url: String, anon_key: String },
    Sqlite { path: PathBuf },
}

/// Validated settings. Building one is the startup gate: a `Config` always
/// names a usable backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: Backend,
    pub request_timeout: Duration,
    pub rollover_period: Duration,
    pub history_limit: usize,
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shop-dashboard")
            .join("config.toml")
    }

    /// Loads the file at `path` (or the default location) and applies
    /// environment overrides. An explicit path must exist; the default may not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(FileConfig::read(path)?),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Some(FileConfig::read(&default)?)
                } else {
                    None
                }
            }
        };

        let mut merged = file.unwrap_or_default();
        merged.apply_env(env)?;
        Self::from_file_config(merged)
    }

    pub fn from_file_config(file: FileConfig) -> Result<Self> {
        let url = file.supabase_url.filter(|s| !s.trim().is_empty());
        let key = file.supabase_anon_key.filter(|s| !s.trim().is_empty());

        let backend = match (url, key, file.sqlite_path) {
            (Some(url), Some(key), _) => {
                if is_placeholder(&url) || is_placeholder(&key) {
                    return Err(AppError::Configuration(
                        "backend URL and key still hold the template placeholders".to_string(),
                    ));
                }
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(AppError::Configuration(format!(
                        "backend URL must start with http:// or https://, got '{}'",
                        url
                    )));
                }
                Backend::Rest {
                    url: url.trim().to_string(),
                    anon_key: key.trim().to_string(),
                }
            }
            (Some(_), None, _) => {
                return Err(AppError::Configuration(format!(
                    "backend URL is set but the access key is missing (set supabase_anon_key or {})",
                    ENV_ANON_KEY
                )))
            }
            (None, Some(_), _) => {
                return Err(AppError::Configuration(format!(
                    "access key is set but the backend URL is missing (set supabase_url or {})",
                    ENV_URL
                )))
            }
            (None, None, Some(path)) => Backend::Sqlite { path },
            (None, None, None) => {
                return Err(AppError::Configuration(format!(
                    "no backend configured: set {} and {}, or {}, or create {}",
                    ENV_URL,
                    ENV_ANON_KEY,
                    ENV_SQLITE_PATH,
                    Self::default_path().display()
                )))
            }
        };

        Ok(Config {
            backend,
            request_timeout: positive_secs(file.request_timeout_secs, DEFAULT_TIMEOUT, "request_timeout_secs")?,
            rollover_period: positive_secs(file.rollover_period_secs, DEFAULT_PERIOD, "rollover_period_secs")?,
            history_limit: file.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        })
    }

    /// Opens the configured store.
    pub fn connect(&self) -> Result<Arc<dyn PersistenceGateway>> {
        match &self.backend {
            Backend::Rest { url, anon_key } => {
                tracing::info!(%url, "using hosted backend");
                let gateway = RestGateway::new(url, anon_key, self.request_timeout)
                    .map_err(|e| AppError::Configuration(e.to_string()))?;
                Ok(Arc::new(gateway))
            }
            Backend::Sqlite { path } => {
                tracing::info!(path = %path.display(), "using local sqlite store");
                let db = Database::open(path, self.request_timeout)
                    .map_err(AppError::persistence(format!("opening {}", path.display())))?;
                Ok(Arc::new(db))
            }
        }
    }
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Configuration(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| AppError::Configuration(format!("invalid {}: {}", path.display(), e)))
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = env(ENV_URL) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = env(ENV_ANON_KEY) {
            self.supabase_anon_key = Some(key);
        }
        if let Some(path) = env(ENV_SQLITE_PATH) {
            self.sqlite_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = env(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = Some(parse_secs(ENV_TIMEOUT_SECS, &secs)?);
        }
        if let Some(secs) = env(ENV_ROLLOVER_SECS) {
            self.rollover_period_secs = Some(parse_secs(ENV_ROLLOVER_SECS, &secs)?);
        }
        Ok(())
    }
}

fn is_placeholder(value: &str) -> bool {
    value.trim().starts_with("YOUR_")
}

fn parse_secs(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Configuration(format!("{} must be a whole number of seconds, got '{}'", name, value)))
}

fn positive_secs(value: Option<u64>, default: Duration, name: &str) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(0) => Err(AppError::Configuration(format!("{} must be greater than zero", name))),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}
