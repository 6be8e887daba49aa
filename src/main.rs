//! Main entry point for the Ladder Room service
//!
//! Loads configuration, opens the ladder, serves the HTTP API and shuts down
//! gracefully on SIGINT/SIGTERM.

use anyhow::Result;
use clap::Parser;
use ladder_room::config::{AppConfig, StorageBackend};
use ladder_room::http::{HttpServer, HttpServerConfig};
use ladder_room::service::{AppState, HealthCheck};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Ladder Room - weekly competitive ladder with margin-aware Elo ratings
#[derive(Parser)]
#[command(
    name = "ladder-room",
    version,
    about = "A weekly competitive ladder service with margin-aware Elo ratings",
    long_about = "Ladder Room tracks teams on a competitive ladder, pairs them into weekly \
                 best-of-5 matches, rates results with Elo plus margin and point-differential \
                 bonuses, and serves standings and history over a JSON API."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override HTTP server port")]
    http_port: Option<u16>,

    /// Data file override
    #[arg(long, value_name = "FILE", help = "Override the JSON data file path")]
    data_path: Option<PathBuf>,

    /// Database file override
    #[arg(long, value_name = "FILE", help = "Override the SQLite database path")]
    database_path: Option<PathBuf>,

    /// Keep the ladder in memory only
    #[arg(long, help = "Use in-memory storage (nothing is persisted)")]
    in_memory: bool,

    /// Print a health report and exit
    #[arg(long, help = "Load the ladder, print a health report and exit")]
    health_check: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load the ladder once, print its health and exit with a matching status code
async fn perform_health_check(config: AppConfig) -> Result<()> {
    let app_state = Arc::new(AppState::new(config)?);
    app_state.start().await?;

    let health = HealthCheck::check(app_state.clone()).await?;
    app_state.shutdown().await?;

    println!("Health Check: {}", health.status);
    println!("  Teams: {} ({} active)", health.stats.teams, health.stats.active_teams);
    println!(
        "  Matches: {} scheduled, {} completed",
        health.stats.scheduled_matches, health.stats.completed_matches
    );
    println!("  Week: {}", health.stats.current_week);
    for check in &health.checks {
        match &check.message {
            Some(message) => println!("  {}: {} ({})", check.name, check.status, message),
            None => println!("  {}: {}", check.name, check.status),
        }
    }

    if health.status == ladder_room::service::HealthStatus::Unhealthy {
        std::process::exit(1);
    }
    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🏆 Ladder Room Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   HTTP: {}:{}",
        config.service.http_host, config.service.http_port
    );
    match config.storage.backend {
        StorageBackend::Json => info!("   Storage: json ({})", config.storage.data_path.display()),
        StorageBackend::Sqlite => info!(
            "   Storage: sqlite ({})",
            config.storage.database_path.display()
        ),
        StorageBackend::Memory => info!("   Storage: memory"),
    }
    info!(
        "   Rating: base {}, K {}, {} placement matches",
        config.rating.initial_rating, config.rating.k_factor, config.rating.placement_matches
    );
    info!(
        "   Inactivity: -{} per week, inactive after {} weeks",
        config.rating.inactivity_penalty, config.ladder.inactive_after_weeks
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from file/environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }

    if let Some(data_path) = &args.data_path {
        config.storage.data_path = data_path.clone();
    }

    if let Some(database_path) = &args.database_path {
        config.storage.database_path = database_path.clone();
    }

    if args.in_memory {
        config.storage.backend = StorageBackend::Memory;
    }

    ladder_room::config::validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // CLI args override environment/config file
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.health_check {
        return perform_health_check(config).await;
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    let app_state = match AppState::new(config.clone()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let server = Arc::new(HttpServer::new(
        HttpServerConfig {
            port: config.service.http_port,
            host: config.service.http_host.clone(),
        },
        app_state.clone(),
    ));

    let mut server_task = {
        let server = server.clone();
        tokio::spawn(async move { server.start().await })
    };

    info!("✅ Ladder Room is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    tokio::select! {
        _ = wait_for_shutdown_signal() => {
            info!("🛑 Shutdown signal received, beginning graceful shutdown...");
        }
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => warn!("HTTP server exited unexpectedly"),
                Ok(Err(e)) => error!("HTTP server failed: {}", e),
                Err(e) => error!("HTTP server task panicked: {}", e),
            }
            app_state.shutdown().await?;
            std::process::exit(1);
        }
    }

    server.stop().await?;
    let shutdown = async {
        match (&mut server_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("HTTP server stopped with error: {}", e),
            Err(e) => warn!("HTTP server task ended abnormally: {}", e),
        }
        app_state.shutdown().await
    };

    match tokio::time::timeout(config.shutdown_timeout(), shutdown).await {
        Ok(Ok(())) => info!("✅ Graceful shutdown completed successfully"),
        Ok(Err(e)) => warn!("Shutdown finished with errors: {}", e),
        Err(_) => warn!("⚠️  Shutdown timeout exceeded, forcing exit"),
    }

    info!("🛑 Ladder Room stopped");
    Ok(())
}
