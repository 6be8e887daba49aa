//! Configuration management for the ladder-room service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values.

pub mod app;
pub mod ladder;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings, StorageBackend, StorageSettings};
pub use ladder::LadderConfig;
pub use rating::{MarginBonus, RatingConfig};
