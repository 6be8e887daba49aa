//! HTTP layer: JSON API, health probes and Prometheus metrics

pub mod api;
pub mod error;
pub mod health;
pub mod server;

pub use error::ApiError;
pub use server::{create_router, HttpServer, HttpServerConfig};
