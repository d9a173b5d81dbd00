//! Blog API server (v1)
//!
//! Serves published posts, search and pagination, admin post management and
//! newsletter subscriptions from PostgreSQL, falling back to an in-memory
//! store when the database is unreachable.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ request id ─▶ trace ─▶ timeout/limits ─▶ health gate ─▶ handler
//!                                                          │              │
//!                              ConnectionStateCell ◀───────┘              ▼
//!                                     ▲                         BoundStorage (one per request)
//!                                     │                            │            │
//!                              ConnectionProber ──ping──▶ PostgreSQL      MemoryStore
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use blog_api::config::loader::load_or_default;
use blog_api::config::validation::redact_database_url;
use blog_api::config::watcher::{apply_updates, ConfigWatcher};
use blog_api::health::probe::ConnectionProber;
use blog_api::health::{ConnectionMonitor, ConnectionStateCell};
use blog_api::lifecycle::signals::wait_for_signal;
use blog_api::observability::{logging, metrics};
use blog_api::storage::memory::MemoryStore;
use blog_api::storage::postgres::PgStore;
use blog_api::storage::Storage;
use blog_api::{AppState, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "blog-api", version, about = "Blog content API")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "BLOG_CONFIG", default_value = "blog.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(&args.config)?;

    logging::init_logging(&config.observability, config.environment);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.environment.as_str(),
        "blog-api starting"
    );

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let shutdown = Shutdown::new();
    let connection = Arc::new(ConnectionStateCell::new());
    let memory = Arc::new(MemoryStore::new());

    let storage = match config.database.url.as_deref() {
        Some(url) => {
            let store = PgStore::connect_lazy(&config.database, url)?;
            tracing::info!(database = %redact_database_url(url), "Durable storage configured");

            let prober = ConnectionProber::new(store.clone(), connection.clone(), config.database.clone());
            tokio::spawn(prober.run(shutdown.subscribe()));

            Storage::new(Arc::new(store), memory)
        }
        None => {
            tracing::warn!("No database configured, API will serve from memory");
            Storage::memory_only(memory)
        }
    };

    let monitor: Arc<dyn ConnectionMonitor> = connection;
    let state = AppState::new(config.clone(), storage, monitor);

    // Keep the watcher handle alive for the lifetime of the server.
    let _watcher = if args.config.exists() {
        let (watcher, updates) = ConfigWatcher::new(&args.config);
        tokio::spawn(apply_updates(state.config.clone(), updates, shutdown.subscribe()));
        match watcher.run() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Config hot reload disabled");
                None
            }
        }
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(state);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
