//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, limits, health gate)
//! - Bind server to listener
//! - Purge expired sessions in the background

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::{handlers as auth_handlers, SessionStore};
use crate::config::BlogConfig;
use crate::health::gate::{health_gate_middleware, HealthGate};
use crate::health::{ConnectionMonitor, StorageModeFlag};
use crate::http::request::{
    propagate_request_id_layer, request_span, set_request_id_layer, track_requests,
};
use crate::storage::Storage;
use crate::{admin, api};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<BlogConfig>>,
    pub storage: Storage,
    pub mode: Arc<StorageModeFlag>,
    pub monitor: Arc<dyn ConnectionMonitor>,
    pub sessions: Arc<SessionStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: BlogConfig, storage: Storage, monitor: Arc<dyn ConnectionMonitor>) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            storage,
            mode: Arc::new(StorageModeFlag::new()),
            monitor,
            sessions: Arc::new(SessionStore::new()),
            started_at: Instant::now(),
        }
    }

    /// The health gate sharing this state's monitor and mode flag.
    pub fn health_gate(&self) -> HealthGate {
        HealthGate::new(self.monitor.clone(), self.mode.clone())
    }
}

/// HTTP server for the blog API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.load_full();

        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/api/auth/login", post(auth_handlers::login))
            .route("/api/auth/logout", post(auth_handlers::logout))
            .route("/api/auth/me", get(auth_handlers::me))
            .merge(api::router(state.clone()))
            .merge(admin::router(state.clone()))
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(
                state.health_gate(),
                health_gate_middleware,
            ))
            .layer(middleware::from_fn(track_requests))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sessions = self.state.sessions.clone();
        let mut purge_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = sessions.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged, "Expired sessions purged");
                        }
                    }
                    _ = purge_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
