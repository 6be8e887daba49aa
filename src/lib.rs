//! Ladder Room - weekly competitive ladder service
//!
//! This crate tracks teams on a ladder, pairs them into weekly matches, and
//! rates best-of-5 results with a margin-aware Elo variant. State lives behind
//! a single-writer store with pluggable persistence and is served over HTTP.

pub mod config;
pub mod error;
pub mod http;
pub mod ladder;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod types;

// Re-export commonly used types and traits
pub use error::{LadderError, Result};
pub use types::*;

// Re-export key components
pub use ladder::{LadderManager, LadderStorage};
pub use rating::{EloMmrCalculator, RatingCalculator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
