//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! ladder-room service, including environment variable loading, TOML file
//! loading and validation.

use crate::config::ladder::LadderConfig;
use crate::config::rating::RatingConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub rating: RatingConfig,
    pub ladder: LadderConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Interface the HTTP server binds to
    pub http_host: String,
    /// Port for the HTTP API
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Where ladder data lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Json,
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "json" => Ok(StorageBackend::Json),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Data file used by the JSON backend; the SQLite backend imports it once
    /// into an empty database
    pub data_path: PathBuf,
    /// Database file used by the SQLite backend
    pub database_path: PathBuf,
    /// Directory holding timestamped backups
    pub backup_dir: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "ladder-room".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 5001,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            data_path: PathBuf::from("ladder.json"),
            database_path: PathBuf::from("ladder.db"),
            backup_dir: PathBuf::from("backups"),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", key, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still override it
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_overrides(|key| env::var(key).ok())?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Apply `KEY=value` overrides from any lookup source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Service settings
        if let Some(name) = lookup("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Some(log_level) = lookup("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Some(host) = lookup("HTTP_HOST") {
            self.service.http_host = host;
        }
        if let Some(port) = lookup("HTTP_PORT") {
            self.service.http_port = parse_var("HTTP_PORT", &port)?;
        }
        if let Some(timeout) = lookup("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = parse_var("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }

        // Storage settings
        if let Some(backend) = lookup("STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(path) = lookup("DATA_PATH") {
            self.storage.data_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("BACKUP_DIR") {
            self.storage.backup_dir = PathBuf::from(dir);
        }

        // Rating settings
        if let Some(initial) = lookup("BASE_MMR") {
            self.rating.initial_rating = parse_var("BASE_MMR", &initial)?;
        }
        if let Some(placement) = lookup("PLACEMENT_MATCHES") {
            self.rating.placement_matches = parse_var("PLACEMENT_MATCHES", &placement)?;
        }
        if let Some(k) = lookup("K_FACTOR") {
            self.rating.k_factor = parse_var("K_FACTOR", &k)?;
        }
        if let Some(multiplier) = lookup("PLACEMENT_K_MULTIPLIER") {
            self.rating.placement_k_multiplier = parse_var("PLACEMENT_K_MULTIPLIER", &multiplier)?;
        }
        if let Some(multiplier) = lookup("CHALLENGE_MULTIPLIER") {
            self.rating.challenge_multiplier = parse_var("CHALLENGE_MULTIPLIER", &multiplier)?;
        }
        if let Some(penalty) = lookup("INACTIVITY_PENALTY") {
            self.rating.inactivity_penalty = parse_var("INACTIVITY_PENALTY", &penalty)?;
        }
        if let Some(multiplier) = lookup("POINT_DIFF_MULTIPLIER") {
            self.rating.point_diff_multiplier = parse_var("POINT_DIFF_MULTIPLIER", &multiplier)?;
        }

        // Ladder settings
        if let Some(weeks) = lookup("INACTIVE_AFTER_WEEKS") {
            self.ladder.inactive_after_weeks = parse_var("INACTIVE_AFTER_WEEKS", &weeks)?;
        }
        if let Some(allow) = lookup("ALLOW_INACTIVE_RESULTS") {
            self.ladder.allow_inactive_results = parse_var("ALLOW_INACTIVE_RESULTS", &allow)?;
        }
        if let Some(count) = lookup("MATCHES_PER_TEAM") {
            self.ladder.default_matches_per_team = parse_var("MATCHES_PER_TEAM", &count)?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    if config.storage.backend == StorageBackend::Json
        && config.storage.data_path.as_os_str().is_empty()
    {
        return Err(anyhow!("Data path cannot be empty for the JSON backend"));
    }
    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.as_os_str().is_empty()
    {
        return Err(anyhow!("Database path cannot be empty for the SQLite backend"));
    }
    if config.storage.backup_dir.as_os_str().is_empty() {
        return Err(anyhow!("Backup directory cannot be empty"));
    }

    config.rating.validate()?;
    config.ladder.validate()?;

    Ok(())
}
