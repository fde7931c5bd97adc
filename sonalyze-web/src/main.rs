//! sonalyze-web - audio upload analysis server
//!
//! Startup order:
//! 1. Parse CLI and load the TOML config
//! 2. Initialize tracing, then log build identification
//! 3. Resolve and create the root folder
//! 4. Open the database and ensure the schema
//! 5. Serve HTTP until Ctrl+C / SIGTERM

use anyhow::{Context, Result};
use clap::Parser;
use sonalyze_common::config::{
    default_config_path, load_config, user_config_path, write_toml_config, RootFolderInitializer, TomlConfig,
};
use sonalyze_web::config::{Cli, ServerSettings};
use sonalyze_web::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file is reported once tracing is up, then ignored
    let (toml_config, config_error) = match load_config(cli.config.as_deref()) {
        Ok(config) => (config.unwrap_or_default(), None),
        Err(e) => (TomlConfig::default(), Some(e)),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=info", toml_config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Sonalyze (sonalyze-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(e) = config_error {
        warn!("Ignoring config file: {} (using defaults)", e);
    }

    let settings = ServerSettings::resolve(&cli, &toml_config);

    if cli.write_config {
        let path = cli
            .config
            .clone()
            .or_else(default_config_path)
            .or_else(user_config_path)
            .context("No config path available; pass --config")?;
        write_toml_config(&settings.to_toml(), &path)?;
        info!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    let initializer = RootFolderInitializer::new(settings.root_folder.clone());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root().display());

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = sonalyze_common::db::init_database(&db_path, settings.reset_database)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    let bind_address = settings.bind_address.clone();
    let state = AppState::new(pool, settings).context("Invalid analysis settings")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
