//! Configuration management for echoaid.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::request::{DEFAULT_URGENCY_SCORE, MAX_URGENCY_SCORE, MIN_URGENCY_SCORE};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "echoaid";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "echoaid.db";

/// Environment variable prefix. Nested keys use a double underscore, e.g.
/// `ECHOAID_AI__API_KEY`.
const ENV_PREFIX: &str = "ECHOAID_";

/// Conventional variable holding the Gemini API key.
const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default Gemini endpoint.
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini model.
pub const DEFAULT_AI_MODEL: &str = "gemini-2.5-flash";

const BASE_URL_PATTERN: &str = r"^https?://[^\s/]+(/\S*)?$";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ECHOAID_`, plus `GEMINI_API_KEY`)
/// 2. TOML config file at `~/.config/echoaid/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// AI collaborator configuration.
    pub ai: AiConfig,
    /// Request lifecycle configuration.
    pub lifecycle: LifecycleConfig,
    /// Mock authentication configuration.
    pub auth: AuthConfig,
    /// Network configuration.
    pub network: NetworkConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/echoaid/echoaid.db`
    pub database_path: Option<PathBuf>,
}

/// AI collaborator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Base URL of the Gemini REST API.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// API key. Without one, every AI call fails as unavailable.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Request lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Urgency score for requests queued offline.
    pub default_urgency_score: u8,
    /// Seconds between pulses for one request.
    pub pulse_cooldown_secs: u64,
    /// Simulated pulse send time in milliseconds.
    pub pulse_latency_ms: u64,
}

/// Mock authentication configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Simulated latency of every auth call in milliseconds.
    pub latency_ms: u64,
}

/// Network configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Start with connectivity marked as absent.
    pub start_offline: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AI_BASE_URL.to_string(),
            model: DEFAULT_AI_MODEL.to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl AiConfig {
    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            default_urgency_score: DEFAULT_URGENCY_SCORE,
            pulse_cooldown_secs: 30,
            pulse_latency_ms: 1_000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { latency_ms: 500 }
    }
}

impl AuthConfig {
    /// Get the simulated latency as a Duration.
    #[must_use]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::raw().only(&[API_KEY_ENV]).map(|_| "ai.api_key".into()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let score = self.lifecycle.default_urgency_score;
        if !(MIN_URGENCY_SCORE..=MAX_URGENCY_SCORE).contains(&score) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "default_urgency_score ({score}) must be between {MIN_URGENCY_SCORE} and {MAX_URGENCY_SCORE}"
                ),
            });
        }

        if self.lifecycle.pulse_cooldown_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "pulse_cooldown_secs must be greater than 0".to_string(),
            });
        }

        if self.ai.model.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "ai model must not be empty".to_string(),
            });
        }

        if self.ai.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "ai timeout_secs must be greater than 0".to_string(),
            });
        }

        let url_pattern = Regex::new(BASE_URL_PATTERN)
            .map_err(|e| Error::internal(format!("base URL pattern: {e}")))?;
        if !url_pattern.is_match(&self.ai.base_url) {
            return Err(Error::ConfigValidation {
                message: format!("invalid ai base_url: {}", self.ai.base_url),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// A copy safe to print, with the API key masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.ai.api_key.is_some() {
            copy.ai.api_key = Some("<redacted>".to_string());
        }
        copy
    }
}
