//! Main entry point for the waitboard service
//!
//! Runs the hospital waiting-time board: loads configuration, seeds the
//! examination and consultation-room stores, refreshes them in the background
//! and shuts down gracefully on Ctrl+C or SIGTERM.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};
use waitboard::config::{validate_config, AppConfig};
use waitboard::service::{AppState, HealthCheck, HealthStatus};

/// Waitboard - shared waiting-time board for examinations and consultation rooms
#[derive(Parser)]
#[command(
    name = "waitboard",
    version,
    about = "Hospital waiting-time board service",
    long_about = "Waitboard keeps the waiting counts, estimated waits and open/closed status of \
                 examinations and consultation rooms in one shared store, refreshes them from the \
                 waiting source on a fixed interval and pushes every change to its subscribers."
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

    /// Perform health check and exit
    #[arg(long, help = "Load the board once, report health and exit with status code")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Refresh interval override
    #[arg(long, value_name = "SECONDS", help = "Override background refresh interval")]
    refresh_interval: Option<u64>,

    /// Print metrics on shutdown
    #[arg(long, help = "Print Prometheus metrics to stdout on shutdown")]
    print_metrics: bool,

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

/// Load the board once, print its health and exit
async fn perform_health_check(config: AppConfig) -> Result<()> {
    info!("Performing health check...");

    let mut app_state = AppState::new(config)?;
    for (kind, result) in app_state.board().refresh_all().await {
        if let Err(e) = result {
            warn!("Initial {} refresh failed: {:#}", kind, e);
        }
    }
    app_state.start().await?;

    let health = HealthCheck::check(&app_state).await;
    app_state.shutdown().await?;

    match health {
        Ok(health) => {
            println!("Health Check: {}", health.status);
            for check in &health.checks {
                match &check.message {
                    Some(message) => println!("  {}: {} ({})", check.name, check.status, message),
                    None => println!("  {}: {}", check.name, check.status),
                }
            }
            println!("  Examinations: {}", health.stats.examinations);
            println!("  Rooms: {}", health.stats.rooms);
            println!("  Failed refreshes: {}", health.stats.failed_refreshes);

            if health.status == HealthStatus::Healthy {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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

async fn log_health(app_state: &AppState) {
    match HealthCheck::check(app_state).await {
        Ok(health) if health.status == HealthStatus::Healthy => {
            info!(
                "Health check: {} - {} examinations, {} rooms",
                health.status, health.stats.examinations, health.stats.rooms
            );
        }
        Ok(health) => {
            let details: Vec<_> = health
                .checks
                .iter()
                .filter_map(|c| c.message.as_deref())
                .collect();
            warn!("Health check: {} - {}", health.status, details.join("; "));
        }
        Err(e) => {
            warn!("Health check failed: {}", e);
        }
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🏥 Waitboard - hospital waiting-time board");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Refresh interval: {}s", config.refresh.interval_seconds);
    info!("   Source timeout: {}s", config.refresh.source_timeout_seconds);
    info!("   Stale after: {}s", config.refresh.stale_after_seconds);
    info!("   Display offset: UTC{:+}", config.display.utc_offset_hours);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from file, environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(seconds) = args.refresh_interval {
        config.set_refresh_interval(seconds);
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    // Handle special modes
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

    let mut app_state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("✅ Waitboard is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    // Periodic health logging until a shutdown signal arrives
    let mut health_interval = interval(config.stale_after().max(Duration::from_secs(1)));
    health_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Skip the immediate tick; the first refresh is still running
    health_interval.tick().await;

    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = health_interval.tick() => log_health(&app_state).await,
        }
    }

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");

    if let Err(e) = app_state.shutdown().await {
        warn!("⚠️  {}", e);
    }

    if args.print_metrics {
        match app_state.metrics().encode_text() {
            Ok(text) => print!("{}", text),
            Err(e) => warn!("Failed to encode metrics: {}", e),
        }
    }

    info!("👋 Waitboard stopped");
    Ok(())
}
