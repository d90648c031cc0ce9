use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub callback: CallbackConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Jobs processed at once; further requests wait for a free slot.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnalysisConfig {
    /// Longer files are analyzed on their first `max_duration_secs` only.
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f64,
    #[serde(default = "default_validate_duration")]
    pub validate_duration_secs: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Temp file suffix when the storage path has no extension.
    #[serde(default = "default_suffix")]
    pub default_suffix: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CallbackConfig {
    #[serde(default = "default_callback_path")]
    pub path: String,
    #[serde(default = "default_callback_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: default_max_duration(),
            validate_duration_secs: default_validate_duration(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            timeout_secs: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            default_suffix: default_suffix(),
        }
    }
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            path: default_callback_path(),
            timeout_secs: default_callback_timeout(),
        }
    }
}

fn default_bind() -> String { "0.0.0.0:8080".into() }
fn default_max_concurrent_jobs() -> usize { 1 }
fn default_max_duration() -> f64 { 300.0 }
fn default_validate_duration() -> f64 { 1.0 }
fn default_embedding_endpoint() -> String { "https://api.openai.com/v1/embeddings".into() }
fn default_embedding_model() -> String { "text-embedding-3-large".into() }
fn default_dimensions() -> usize { 1536 }
fn default_bucket() -> String { "audio-files".into() }
fn default_suffix() -> String { ".mp3".into() }
fn default_callback_path() -> String { "/api/analysis/callback".into() }
fn default_callback_timeout() -> u64 { 30 }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Explicit path, else `musaix.toml` in the working directory, else the
/// per-user config locations.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("musaix.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("musaix").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("musaix").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub const ENV_EMBEDDING_KEY: &str = "OPENAI_API_KEY";
pub const ENV_STORAGE_URL: &str = "NEXT_PUBLIC_SUPABASE_URL";
pub const ENV_STORAGE_KEY: &str = "SUPABASE_SERVICE_KEY";
pub const ENV_APP_URL: &str = "NEXT_PUBLIC_APP_URL";
pub const ENV_WEBHOOK_SECRET: &str = "VERCEL_WEBHOOK_SECRET";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// Secrets and endpoints read from the environment once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub embedding_api_key: String,
    pub storage_url: String,
    pub storage_service_key: String,
    pub app_url: String,
    pub webhook_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("storage_url", &self.storage_url)
            .field("app_url", &self.app_url)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Every missing or empty variable is reported in one error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut take = |name: &'static str| match lookup(name) {
            Some(value) if !value.trim().is_empty() => value,
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let credentials = Self {
            embedding_api_key: take(ENV_EMBEDDING_KEY),
            storage_url: take(ENV_STORAGE_URL),
            storage_service_key: take(ENV_STORAGE_KEY),
            app_url: take(ENV_APP_URL),
            webhook_secret: take(ENV_WEBHOOK_SECRET),
        };

        if missing.is_empty() {
            Ok(credentials)
        } else {
            Err(ConfigError::Missing(missing))
        }
    }
}

/// Single required variable, for commands that only call the embedding service.
pub fn require_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(vec![name])),
    }
}
