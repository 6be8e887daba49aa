//! Metrics collection using Prometheus
//!
//! Counters and gauges for the ladder: results rated, matches generated,
//! inactivity penalties, and failed operations by error kind.

use crate::error::ErrorKind;
use crate::ladder::manager::LadderStats;
use crate::types::MatchType;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the ladder service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Ladder state and activity metrics
    ladder_metrics: LadderMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Failed ladder operations by error kind
    pub operation_errors_total: IntCounterVec,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Ladder-related metrics
#[derive(Clone)]
pub struct LadderMetrics {
    /// Match results rated, by match type
    pub results_submitted_total: IntCounterVec,

    /// Matches created by the pairing generator
    pub matches_generated_total: IntCounter,

    /// Matches scheduled by hand
    pub matches_scheduled_total: IntCounter,

    /// Inactivity penalties charged
    pub inactivity_penalties_total: IntCounter,

    /// Teams moved to inactive by a sweep
    pub teams_deactivated_total: IntCounter,

    /// Teams by state (active, inactive)
    pub teams: IntGaugeVec,

    /// Matches by state (scheduled, completed)
    pub matches: IntGaugeVec,

    /// Current ladder week
    pub current_week: IntGauge,

    /// Absolute rating change applied to each side of a rated match
    pub rating_delta: Histogram,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Duration of committed ladder operations
    pub operation_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let ladder_metrics = LadderMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            ladder_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get ladder metrics
    pub fn ladder(&self) -> &LadderMetrics {
        &self.ladder_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Refresh state gauges from ladder stats
    pub fn update_from_ladder_stats(&self, stats: &LadderStats) {
        self.ladder_metrics
            .teams
            .with_label_values(&["active"])
            .set(stats.active_teams as i64);
        self.ladder_metrics
            .teams
            .with_label_values(&["inactive"])
            .set((stats.teams - stats.active_teams) as i64);
        self.ladder_metrics
            .matches
            .with_label_values(&["scheduled"])
            .set(stats.scheduled_matches as i64);
        self.ladder_metrics
            .matches
            .with_label_values(&["completed"])
            .set(stats.completed_matches as i64);
        self.ladder_metrics
            .current_week
            .set(stats.current_week as i64);
    }

    /// Record a rated match result
    pub fn record_result(&self, match_type: MatchType, delta_a: i64, delta_b: i64) {
        let match_type_str = match match_type {
            MatchType::Regular => "regular",
            MatchType::Challenge => "challenge",
        };

        self.ladder_metrics
            .results_submitted_total
            .with_label_values(&[match_type_str])
            .inc();

        self.ladder_metrics
            .rating_delta
            .observe(delta_a.unsigned_abs() as f64);
        self.ladder_metrics
            .rating_delta
            .observe(delta_b.unsigned_abs() as f64);
    }

    /// Record matches created by the generator
    pub fn record_matches_generated(&self, count: usize) {
        self.ladder_metrics
            .matches_generated_total
            .inc_by(count as u64);
    }

    /// Record a hand-scheduled match
    pub fn record_match_scheduled(&self) {
        self.ladder_metrics.matches_scheduled_total.inc();
    }

    /// Record the outcome of an inactivity sweep
    pub fn record_inactivity_sweep(&self, penalties: usize, deactivated: usize) {
        self.ladder_metrics
            .inactivity_penalties_total
            .inc_by(penalties as u64);
        self.ladder_metrics
            .teams_deactivated_total
            .inc_by(deactivated as u64);
    }

    /// Record a failed operation
    pub fn record_operation_error(&self, operation: &str, kind: ErrorKind) {
        self.service_metrics
            .operation_errors_total
            .with_label_values(&[operation, kind.as_str()])
            .inc();
    }

    /// Record how long a committed operation took
    pub fn record_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let operation_errors_total = IntCounterVec::new(
            Opts::new(
                "ladder_room_operation_errors_total",
                "Total failed ladder operations",
            ),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(operation_errors_total.clone()))?;

        let health_status = IntGauge::new(
            "ladder_room_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("ladder_room_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            operation_errors_total,
            health_status,
            component_health,
        })
    }
}

impl LadderMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let results_submitted_total = IntCounterVec::new(
            Opts::new(
                "ladder_room_results_submitted_total",
                "Total match results rated",
            ),
            &["match_type"],
        )?;
        registry.register(Box::new(results_submitted_total.clone()))?;

        let matches_generated_total = IntCounter::new(
            "ladder_room_matches_generated_total",
            "Total matches created by pairing generation",
        )?;
        registry.register(Box::new(matches_generated_total.clone()))?;

        let matches_scheduled_total = IntCounter::new(
            "ladder_room_matches_scheduled_total",
            "Total matches scheduled by hand",
        )?;
        registry.register(Box::new(matches_scheduled_total.clone()))?;

        let inactivity_penalties_total = IntCounter::new(
            "ladder_room_inactivity_penalties_total",
            "Total inactivity penalties charged",
        )?;
        registry.register(Box::new(inactivity_penalties_total.clone()))?;

        let teams_deactivated_total = IntCounter::new(
            "ladder_room_teams_deactivated_total",
            "Total teams marked inactive by sweeps",
        )?;
        registry.register(Box::new(teams_deactivated_total.clone()))?;

        let teams = IntGaugeVec::new(
            Opts::new("ladder_room_teams", "Number of teams by state"),
            &["state"],
        )?;
        registry.register(Box::new(teams.clone()))?;

        let matches = IntGaugeVec::new(
            Opts::new("ladder_room_matches", "Number of matches by state"),
            &["state"],
        )?;
        registry.register(Box::new(matches.clone()))?;

        let current_week = IntGauge::new("ladder_room_current_week", "Current ladder week")?;
        registry.register(Box::new(current_week.clone()))?;

        let rating_delta = Histogram::with_opts(
            HistogramOpts::new(
                "ladder_room_rating_delta",
                "Absolute rating change per side of a rated match",
            )
            .buckets(vec![1.0, 2.0, 5.0, 10.0, 15.0, 20.0, 30.0, 40.0, 60.0]),
        )?;
        registry.register(Box::new(rating_delta.clone()))?;

        Ok(Self {
            results_submitted_total,
            matches_generated_total,
            matches_scheduled_total,
            inactivity_penalties_total,
            teams_deactivated_total,
            teams,
            matches,
            current_week,
            rating_delta,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "ladder_room_operation_duration_seconds",
                "Duration of committed ladder operations",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self { operation_duration })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _service = collector.service();
        let _ladder = collector.ladder();
        let _performance = collector.performance();
    }

    #[test]
    fn test_result_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_result(MatchType::Regular, 18, -10);
        collector.record_result(MatchType::Challenge, 9, -5);

        let ladder = collector.ladder();
        assert_eq!(
            ladder
                .results_submitted_total
                .with_label_values(&["regular"])
                .get(),
            1
        );
        assert_eq!(
            ladder
                .results_submitted_total
                .with_label_values(&["challenge"])
                .get(),
            1
        );
        assert_eq!(ladder.rating_delta.get_sample_count(), 4);
    }

    #[test]
    fn test_stats_update() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.update_from_ladder_stats(&LadderStats {
            teams: 5,
            active_teams: 4,
            matches: 7,
            scheduled_matches: 2,
            completed_matches: 5,
            current_week: 3,
        });

        let ladder = collector.ladder();
        assert_eq!(ladder.teams.with_label_values(&["active"]).get(), 4);
        assert_eq!(ladder.teams.with_label_values(&["inactive"]).get(), 1);
        assert_eq!(ladder.matches.with_label_values(&["completed"]).get(), 5);
        assert_eq!(ladder.current_week.get(), 3);
    }

    #[test]
    fn test_error_and_sweep_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_operation_error("submit_result", ErrorKind::InvalidState);
        collector.record_inactivity_sweep(3, 1);
        collector.record_matches_generated(4);
        collector.record_operation("submit_result", Duration::from_micros(200));

        assert_eq!(
            collector
                .service()
                .operation_errors_total
                .with_label_values(&["submit_result", "invalid_state"])
                .get(),
            1
        );
        assert_eq!(collector.ladder().inactivity_penalties_total.get(), 3);
        assert_eq!(collector.ladder().matches_generated_total.get(), 4);
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}
