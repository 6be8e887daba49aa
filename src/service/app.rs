//! Main application state and service coordination
//!
//! `AppState` owns the configured ladder, its storage backend and the metrics
//! collector, and runs the background health task while the service is up.

use crate::config::{AppConfig, StorageBackend};
use crate::ladder::{
    InMemoryLadderStorage, JsonFileStorage, LadderManager, LadderStorage, SqliteStorage,
};
use crate::metrics::MetricsCollector;
use crate::rating::EloMmrCalculator;
use crate::service::health::{HealthCheck, HealthStatus};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Interval of the background health task
const HEALTH_INTERVAL: Duration = Duration::from_secs(30);

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// The ladder itself
    ladder: Arc<LadderManager>,

    /// Prometheus metrics
    metrics: Arc<MetricsCollector>,

    /// Background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application with the storage backend named in `config`
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        let storage: Arc<dyn LadderStorage> = match config.storage.backend {
            StorageBackend::Memory => {
                warn!("Using in-memory storage; ladder data will not survive a restart");
                Arc::new(InMemoryLadderStorage::new())
            }
            StorageBackend::Json => {
                info!(
                    "Using JSON storage at {}",
                    config.storage.data_path.display()
                );
                Arc::new(JsonFileStorage::new(config.storage.data_path.clone()))
            }
            StorageBackend::Sqlite => {
                info!(
                    "Using SQLite storage at {}",
                    config.storage.database_path.display()
                );
                let storage = SqliteStorage::open(config.storage.database_path.clone())
                    .map_err(|e| ServiceError::Storage {
                        message: format!("Failed to open database: {}", e),
                    })?;
                storage
                    .migrate_from_json(&config.storage.data_path)
                    .map_err(|e| ServiceError::Storage {
                        message: format!("Failed to migrate JSON data: {}", e),
                    })?;
                Arc::new(storage)
            }
        };

        Self::with_storage(config, storage)
    }

    /// Initialize the application on top of an explicit storage backend
    pub fn with_storage(
        config: AppConfig,
        storage: Arc<dyn LadderStorage>,
    ) -> Result<Self, ServiceError> {
        info!("Initializing ladder-room service '{}'", config.service.name);

        let metrics = Arc::new(
            MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            })?,
        );

        let calculator = Arc::new(EloMmrCalculator::new(config.rating.clone()).map_err(|e| {
            ServiceError::Configuration {
                message: format!("Invalid rating configuration: {}", e),
            }
        })?);

        config
            .ladder
            .validate()
            .map_err(|e| ServiceError::Configuration {
                message: format!("Invalid ladder configuration: {}", e),
            })?;

        let ladder = LadderManager::new(storage, calculator, config.ladder.clone())
            .map_err(|e| ServiceError::Storage {
                message: format!("Failed to load ladder: {}", e),
            })?
            .with_metrics(metrics.clone());

        Ok(Self {
            config,
            ladder: Arc::new(ladder),
            metrics,
            background_tasks: Mutex::new(Vec::new()),
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Mark the service running and start background tasks
    pub async fn start(self: &Arc<Self>) -> Result<(), ServiceError> {
        info!("Starting ladder-room service");

        *self.is_running.write().await = true;

        let health_task = {
            let state = Arc::clone(self);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(HEALTH_INTERVAL);
                debug!("Health task started");

                while state.is_running().await {
                    interval.tick().await;
                    state.refresh_health_metrics().await;
                }

                debug!("Health task stopped");
            })
        };

        self.background_tasks
            .lock()
            .map_err(|_| ServiceError::Initialization {
                message: "Background task list is poisoned".to_string(),
            })?
            .push(health_task);

        info!("✅ Ladder-room service started");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of ladder-room service");

        *self.is_running.write().await = false;

        let tasks: Vec<JoinHandle<()>> = match self.background_tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(_) => {
                warn!("Background task list is poisoned; skipping task shutdown");
                Vec::new()
            }
        };
        for task in &tasks {
            task.abort();
        }
        debug!("Stopped {} background tasks", tasks.len());

        match self.ladder.stats() {
            Ok(stats) => info!("Final ladder statistics: {:?}", stats),
            Err(e) => warn!("Failed to read final ladder statistics: {}", e),
        }

        info!("✅ Ladder-room service shutdown completed");
        Ok(())
    }

    /// Run a health check and publish the result as metrics
    pub async fn refresh_health_metrics(self: &Arc<Self>) {
        match HealthCheck::check(Arc::clone(self)).await {
            Ok(health) => {
                let status = match health.status {
                    HealthStatus::Healthy => 2,
                    HealthStatus::Degraded => 1,
                    HealthStatus::Unhealthy => 0,
                };
                self.metrics.update_health_status(status);
                for check in &health.checks {
                    self.metrics
                        .update_component_health(&check.name, check.status != HealthStatus::Unhealthy);
                }
                debug!(
                    "Health: {} - {} teams, {} scheduled matches, week {}",
                    health.status,
                    health.stats.teams,
                    health.stats.scheduled_matches,
                    health.stats.current_week
                );
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                self.metrics.update_health_status(0);
            }
        }
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn ladder(&self) -> Arc<LadderManager> {
        self.ladder.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let state = Arc::new(AppState::new(memory_config()).unwrap());
        assert!(!state.is_running().await);

        state.start().await.unwrap();
        assert!(state.is_running().await);

        state.shutdown().await.unwrap();
        assert!(!state.is_running().await);
    }

    #[tokio::test]
    async fn test_health_metrics_are_published() {
        let state = Arc::new(AppState::new(memory_config()).unwrap());
        state.start().await.unwrap();
        state.refresh_health_metrics().await;

        // In-memory storage reports as degraded
        assert_eq!(state.metrics().service().health_status.get(), 1);
        assert_eq!(
            state
                .metrics()
                .service()
                .component_health
                .with_label_values(&["ladder"])
                .get(),
            1
        );
        state.shutdown().await.unwrap();
    }

    #[test]
    fn test_invalid_rating_config_is_rejected() {
        let mut config = memory_config();
        config.rating.k_factor = 0.0;
        let err = AppState::new(config).err().unwrap();
        assert!(matches!(err, ServiceError::Configuration { .. }));
    }

    #[test]
    fn test_invalid_ladder_config_is_rejected() {
        let mut config = memory_config();
        config.ladder.inactive_after_weeks = 0;
        let err = AppState::new(config).err().unwrap();
        assert!(matches!(err, ServiceError::Configuration { .. }));
    }

    #[test]
    fn test_sqlite_backend_imports_legacy_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.data_path = dir.path().join("ladder.json");
        config.storage.database_path = dir.path().join("ladder.db");

        {
            let state = AppState::new(config.clone()).unwrap();
            state.ladder().register_team("Alpha").unwrap();
        }

        config.storage.backend = StorageBackend::Sqlite;
        let state = AppState::new(config.clone()).unwrap();
        assert!(state.ladder().get_team("Alpha").is_ok());
        state.ladder().register_team("Bravo").unwrap();
        drop(state);

        // Later starts read the database, not the legacy file
        let state = AppState::new(config).unwrap();
        assert_eq!(state.ladder().list_teams().unwrap().len(), 2);
    }

    #[test]
    fn test_json_backend_loads_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.data_path = dir.path().join("ladder.json");

        {
            let state = AppState::new(config.clone()).unwrap();
            state.ladder().register_team("Alpha").unwrap();
        }

        let state = AppState::new(config).unwrap();
        assert_eq!(state.ladder().get_team("Alpha").unwrap().rating, 1000);
    }
}
