//! Service layer for the ladder-room service
//!
//! This module contains the main application state, health checks and
//! background task management for the running service.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
