//! defgraph Configuration Management
//!
//! Handles configuration from environment variables and config files
//! with sensible defaults for local use.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::SUPPORTED_DICTIONARIES;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Graph store location
    pub database: DatabaseConfig,

    /// Graph build settings
    pub build: BuildConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Store
        if let Ok(dir) = std::env::var("DEFGRAPH_DATA_DIR") {
            config.database.data_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("DEFGRAPH_DICTIONARY") {
            config.database.dictionary = name;
        }

        // Build
        if let Ok(dir) = std::env::var("DEFGRAPH_SOURCE_DIR") {
            config.build.source_dir = PathBuf::from(dir);
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            config.logging.json_format = json.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LOG_JSON".to_string(),
                value: json,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        // Only override if env values differ from defaults
        if env_config.database.data_dir != DatabaseConfig::default().data_dir {
            self.database.data_dir = env_config.database.data_dir;
        }
        if env_config.database.dictionary != DatabaseConfig::default().dictionary {
            self.database.dictionary = env_config.database.dictionary;
        }
        if env_config.build.source_dir != BuildConfig::default().source_dir {
            self.build.source_dir = env_config.build.source_dir;
        }
        if env_config.logging.level != LoggingConfig::default().level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format {
            self.logging.json_format = true;
        }

        Ok(self)
    }

    /// Reject values no graph can be opened with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_DICTIONARIES.contains(&self.database.dictionary.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "database.dictionary".to_string(),
                value: self.database.dictionary.clone(),
            });
        }
        if self.build.noun_tag.is_empty() {
            return Err(ConfigError::MissingRequired("build.noun_tag".to_string()));
        }
        if self.build.verb_tag_prefix.is_empty() {
            return Err(ConfigError::MissingRequired(
                "build.verb_tag_prefix".to_string(),
            ));
        }
        Ok(())
    }
}

/// Graph store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory holding one SQLite file per dictionary
    pub data_dir: PathBuf,

    /// Dictionary name
    pub dictionary: String,
}

impl DatabaseConfig {
    /// Path of the SQLite file for the configured dictionary
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.sqlite", self.dictionary))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            dictionary: "OPTED".to_string(),
        }
    }
}

/// Graph build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory with the raw dictionary pages
    pub source_dir: PathBuf,

    /// Word class marking nouns
    pub noun_tag: String,

    /// Prefix shared by every verb word class (`v. t.`, `v. i.`, ...)
    pub verb_tag_prefix: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("files"),
            noun_tag: "n.".to_string(),
            verb_tag_prefix: "v.".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
