use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

use crate::error::LensError;

/// Which classifier backend answers `(text) -> intent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierBackend {
    #[default]
    Keyword,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/equipment.db".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    /// Results below this confidence are reported as ambiguous.
    pub confidence_threshold: f64,
    /// OpenAI-compatible chat completions endpoint.
    pub endpoint: Option<Url>,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Keyword,
            confidence_threshold: 0.3,
            endpoint: None,
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub row_limit: u32,
    pub maintenance_window_days: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            row_limit: 100,
            maintenance_window_days: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub classifier: ClassifierConfig,
    pub query: QueryConfig,
}

impl Config {
    /// Defaults, then `config.toml`, then `LENS_*` environment variables
    /// (`LENS_CLASSIFIER__MODEL` sets `classifier.model`).
    pub fn load() -> Result<Self, LensError> {
        Ok(Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("LENS_").split("__"))
            .extract()?)
    }
}

pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| {
        eprintln!("invalid configuration, falling back to defaults: {e}");
        Config::default()
    })
});
