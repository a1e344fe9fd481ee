use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use api::{AppState, config::ServerConfig, routes};
use common::database::{Database, DatabaseConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting API service");

    let server_config = ServerConfig::from_env()?;
    let db_config = DatabaseConfig::from_env()?;

    // Initialize database connection pool
    let database = Database::connect(&db_config).await?;

    // Check database connectivity
    if database.health_check().await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    if server_config.run_migrations {
        api::run_migrations(&database).await?;
        info!("Database migrations applied");
    }

    let app = routes::create_router(AppState::new(database.clone()));

    let address = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped accepting connections, closing database pool");
    database.close().await;

    Ok(())
}

/// Resolve on SIGINT, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        () = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
