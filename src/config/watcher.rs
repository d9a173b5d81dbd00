//! Configuration file watcher for hot reload.
//!
//! Only admin credentials and pagination take effect live. Listener, database
//! and environment changes are logged and wait for a restart.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::config::loader::load_config;
use crate::config::schema::BlogConfig;

/// Watches the configuration file and publishes validated reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<BlogConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<BlogConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                match load_config(&path) {
                    Ok(config) => {
                        if tx.send(config).is_err() {
                            tracing::debug!("Config receiver dropped, ignoring change");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Config reload rejected, keeping current configuration");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Config watch error"),
        };

        let mut watcher = RecommendedWatcher::new(
            handler,
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Swap reloaded configurations into the live handle until shutdown.
pub async fn apply_updates(
    live: Arc<ArcSwap<BlogConfig>>,
    mut updates: mpsc::UnboundedReceiver<BlogConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            next = updates.recv() => match next {
                Some(config) => {
                    warn_restart_required(&live.load(), &config);
                    live.store(Arc::new(config));
                    tracing::info!("Configuration reloaded");
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}

fn warn_restart_required(current: &BlogConfig, next: &BlogConfig) {
    if current.listener.bind_address != next.listener.bind_address {
        tracing::warn!("listener.bind_address changed; restart required");
    }
    if current.database.url != next.database.url {
        tracing::warn!("database.url changed; restart required");
    }
    if current.environment != next.environment {
        tracing::warn!("environment changed; restart required");
    }
}
