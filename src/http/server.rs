//! HTTP server: probes, Prometheus metrics and the ladder API on one listener

use crate::http::{api, health};
use crate::service::app::AppState;
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: 5001,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// HTTP front end of the ladder service
pub struct HttpServer {
    config: HttpServerConfig,
    state: Arc<AppState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, state: Arc<AppState>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state,
            shutdown_tx,
        }
    }

    /// Bind and serve until [`stop`](Self::stop) is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid HTTP server address")?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!("HTTP server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, self.create_router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Create the Axum router with every endpoint
    pub fn create_router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping HTTP server...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }

        Ok(())
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/ready", get(health::ready_handler))
        .route("/alive", get(health::alive_handler))
        .route("/metrics", get(health::metrics_handler))
        .route("/stats", get(health::stats_handler))
        .route("/api/standings", get(api::standings))
        .route("/api/teams", get(api::list_teams).post(api::create_team))
        .route(
            "/api/teams/{name}",
            get(api::get_team).patch(api::update_team),
        )
        .route("/api/teams/{name}/history", get(api::team_history))
        .route("/api/teams/{name}/deactivate", post(api::deactivate_team))
        .route("/api/teams/{name}/reactivate", post(api::reactivate_team))
        .route(
            "/api/matches",
            get(api::list_matches).post(api::create_match),
        )
        .route("/api/matches/generate", post(api::generate_matches))
        .route(
            "/api/matches/{id}",
            get(api::get_match).delete(api::delete_match),
        )
        .route("/api/matches/{id}/result", post(api::submit_result))
        .route("/api/inactivity/sweep", post(api::inactivity_sweep))
        .route("/api/week", get(api::current_week).put(api::set_week))
        .route("/api/week/advance", post(api::advance_week))
        .route("/api/export", get(api::export))
        .route(
            "/api/admin/backups",
            get(api::list_backups).post(api::create_backup),
        )
        .route("/api/admin/restore", post(api::restore_backup))
        .route("/api/admin/refresh", post(api::refresh))
        .with_state(state)
}
