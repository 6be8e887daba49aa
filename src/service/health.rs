//! Health checks for the ladder service
//!
//! Readiness and liveness probes plus a detailed report used by `/stats`.

use crate::config::StorageBackend;
use crate::service::app::AppState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional error message if not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Ladder statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub teams: usize,
    pub active_teams: usize,
    pub scheduled_matches: usize,
    pub completed_matches: usize,
    pub current_week: u32,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(app_state: Arc<AppState>) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(&app_state).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        for check in [
            Self::check_ladder(&app_state),
            Self::check_storage(&app_state),
        ] {
            if check.status == HealthStatus::Unhealthy {
                overall_status = HealthStatus::Unhealthy;
            } else if check.status == HealthStatus::Degraded
                && overall_status == HealthStatus::Healthy
            {
                overall_status = HealthStatus::Degraded;
            }
            checks.push(check);
        }

        Ok(HealthCheck {
            status: overall_status,
            service: app_state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: Self::gather_service_stats(&app_state),
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if app_state.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - verify the ladder can serve requests
    pub async fn readiness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if !app_state.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        Ok(Self::check_ladder(&app_state).status)
    }

    async fn check_service_running(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if app_state.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// The ladder answers reads
    fn check_ladder(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = match app_state.ladder().stats() {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Ladder stats check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Ladder unavailable: {}", e)),
                )
            }
        };

        ComponentCheck {
            name: "ladder".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// The configured data file or database is still reachable
    fn check_storage(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();
        let storage = &app_state.config().storage;

        let (status, message) = match storage.backend {
            StorageBackend::Memory => (
                HealthStatus::Degraded,
                Some("In-memory storage is not persistent".to_string()),
            ),
            StorageBackend::Json => {
                let dir = storage
                    .data_path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| std::path::Path::new("."));
                if dir.is_dir() {
                    (HealthStatus::Healthy, None)
                } else {
                    (
                        HealthStatus::Unhealthy,
                        Some(format!("Data directory {} is missing", dir.display())),
                    )
                }
            }
            StorageBackend::Sqlite => {
                if storage.database_path.is_file() {
                    (HealthStatus::Healthy, None)
                } else {
                    (
                        HealthStatus::Unhealthy,
                        Some(format!(
                            "Database {} is missing",
                            storage.database_path.display()
                        )),
                    )
                }
            }
        };

        ComponentCheck {
            name: "storage".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_service_stats(app_state: &AppState) -> ServiceStats {
        let uptime_seconds = app_state.uptime().as_secs();
        match app_state.ladder().stats() {
            Ok(stats) => ServiceStats {
                teams: stats.teams,
                active_teams: stats.active_teams,
                scheduled_matches: stats.scheduled_matches,
                completed_matches: stats.completed_matches,
                current_week: stats.current_week,
                uptime_seconds,
            },
            Err(_) => ServiceStats {
                uptime_seconds,
                ..ServiceStats::default()
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn state_with(backend: StorageBackend, dir: &std::path::Path) -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.storage.backend = backend;
        config.storage.data_path = dir.join("ladder.json");
        config.storage.database_path = dir.join("ladder.db");
        Arc::new(AppState::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_not_running_is_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(StorageBackend::Json, dir.path());

        let health = HealthCheck::check(state.clone()).await.unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(
            HealthCheck::readiness_check(state).await.unwrap(),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_running_json_backend_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(StorageBackend::Json, dir.path());
        state.start().await.unwrap();
        state.ladder().register_team("Alpha").unwrap();

        let health = HealthCheck::check(state.clone()).await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.stats.teams, 1);
        assert_eq!(health.checks.len(), 3);
        assert!(health.to_json().unwrap().contains("\"ladder\""));

        state.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_backend_is_degraded() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(StorageBackend::Memory, dir.path());
        state.start().await.unwrap();

        let health = HealthCheck::check(state.clone()).await.unwrap();
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(
            HealthCheck::readiness_check(state.clone()).await.unwrap(),
            HealthStatus::Healthy
        );

        state.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_sqlite_backend_health() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(StorageBackend::Sqlite, dir.path());
        state.start().await.unwrap();

        let health = HealthCheck::check(state.clone()).await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);

        std::fs::remove_file(dir.path().join("ladder.db")).unwrap();
        let health = HealthCheck::check(state.clone()).await.unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);

        state.shutdown().await.unwrap();
    }
}
