//! Metrics for the ladder service
//!
//! Prometheus collectors are owned by [`MetricsCollector`]; the HTTP layer
//! exposes the registry on `/metrics`.

pub mod collector;

pub use collector::{
    LadderMetrics, MetricsCollector, MetricsTimer, PerformanceMetrics, ServiceMetrics,
};
