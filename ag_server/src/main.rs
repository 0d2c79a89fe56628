//! Authentication server.
//!
//! Serves the user endpoints with tokens, sessions and abuse guards backed
//! by PostgreSQL, or by an in-process store for local development.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ag_server::{
    api,
    config::{ServerConfig, StoreBackend},
    logging, metrics,
};
use anyhow::Error;
use authguard::{
    credential::{MemoryCredentialRepository, PgCredentialRepository},
    digest::Argon2Digest,
    store::{MemoryCounterStore, PgCounterStore},
};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;

const HELP: &str = "\
Run the authguard authentication server

USAGE:
  ag_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --memory-store           Keep counters, sessions and accounts in process memory
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JWT_ACCESS_SECRET        Access token signing secret (required, 32+ chars)
  JWT_REFRESH_SECRET       Refresh token signing secret (required, 32+ chars)
  PASSWORD_PEPPER          Password hashing pepper (required, 16+ chars)
  RATE_LIMIT_RULES         path:window:limit[:session],...
  METRICS_BIND             Prometheus exporter address
  (See .env.example for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let memory_store = pargs.contains("--memory-store");

    let config = ServerConfig::from_env(bind, database_url, memory_store)?;
    config.validate()?;

    logging::init();

    // Catching signals for exit.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported on http://{}/metrics", addr);
    }

    let digest = Arc::new(Argon2Digest::new(config.password_pepper.clone()));
    let purge_every = Duration::from_secs(config.purge_interval_secs);

    let state = match config.backend {
        StoreBackend::Memory => {
            info!("Using in-process store; state is lost on restart");
            let store = Arc::new(MemoryCounterStore::new());
            spawn_memory_sweeper(store.clone(), purge_every, shutdown_rx.clone());
            api::AppState::new(
                store,
                Arc::new(MemoryCredentialRepository::new()),
                digest,
                &config.auth,
            )
        }
        StoreBackend::Postgres => {
            info!("Connecting to database");
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
                .connect(&config.database.database_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            let pool = Arc::new(pool);
            info!("Database connected successfully");

            let store = Arc::new(PgCounterStore::new(pool.clone()));
            store.ensure_schema().await?;
            let repository = Arc::new(PgCredentialRepository::new(pool));
            repository.ensure_schema().await?;

            spawn_pg_sweeper(store.clone(), purge_every, shutdown_rx.clone());
            api::AppState::new(store, repository, digest, &config.auth)
        }
    };

    let app = api::create_router(state);

    info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_rx))
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Resolves once the signal handler fired
async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Periodically drop expired rows from the Postgres store
fn spawn_pg_sweeper(store: Arc<PgCounterStore>, every: Duration, shutdown: watch::Receiver<bool>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => match store.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => log::debug!("Purged {} expired store rows", purged),
                    Err(e) => log::warn!("Store purge failed: {}", e),
                },
                _ = shutdown_signal(shutdown.clone()) => break,
            }
        }
    });
}

/// Periodically drop expired entries from the in-process store
fn spawn_memory_sweeper(
    store: Arc<MemoryCounterStore>,
    every: Duration,
    shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = store.purge_expired().await;
                    if purged > 0 {
                        log::debug!("Purged {} expired store entries", purged);
                    }
                }
                _ = shutdown_signal(shutdown.clone()) => break,
            }
        }
    });
}
