// Configuration loading and parsing (config/auction.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::auction::player::Money;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub auction: AuctionConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the valuation service (e.g. `http://localhost:5000`).
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuctionConfig {
    /// Budget assigned to the main team when the UI does not override it.
    pub default_budget: Money,
    /// How many candidate squads to request when the UI does not say.
    pub default_num_squads: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/auction.toml` relative to
/// the given `base_dir` (the embedding app's working directory).
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("auction.toml");
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;

    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.service.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "service.base_url".into(),
            message: "must not be empty".into(),
        });
    }

    if !config.auction.default_budget.is_positive() {
        return Err(ConfigError::ValidationError {
            field: "auction.default_budget".into(),
            message: format!("must be > 0, got {}", config.auction.default_budget),
        });
    }

    if config.auction.default_num_squads == 0 {
        return Err(ConfigError::ValidationError {
            field: "auction.default_num_squads".into(),
            message: "must be >= 1".into(),
        });
    }

    if config.database.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
