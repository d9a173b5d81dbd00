//! Health gate middleware.
//!
//! # Responsibilities
//! - Run once per inbound request, before any handler
//! - Decide which storage backend serves the request
//! - Degrade the whole process the first time the database is seen down
//! - Stamp the decision into the request extensions
//!
//! # Design Decisions
//! - Never rejects a request; it only annotates it
//! - Auth routes and non-API paths bypass mode logic entirely
//! - Once degraded, the connection is not probed again
//! - Any monitor failure counts as "not connected"

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::health::connection::{observe_state, ConnectionMonitor};
use crate::health::mode::{StorageMode, StorageModeFlag};
use crate::observability::metrics;

/// Namespace that requires a storage mode.
pub const API_PREFIX: &str = "/api";

/// Routes that must keep working with storage fully down.
pub const AUTH_PATHS: &[&str] = &["/api/auth/login", "/api/auth/logout", "/api/auth/me"];

/// Storage mode resolved for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageContext {
    pub mode: StorageMode,
}

/// Shared state for the gate.
#[derive(Clone)]
pub struct HealthGate {
    monitor: Arc<dyn ConnectionMonitor>,
    mode: Arc<StorageModeFlag>,
}

impl HealthGate {
    pub fn new(monitor: Arc<dyn ConnectionMonitor>, mode: Arc<StorageModeFlag>) -> Self {
        Self { monitor, mode }
    }

    /// Resolve the storage mode for a request path.
    ///
    /// Returns `None` when the path bypasses mode logic.
    pub fn resolve(&self, path: &str) -> Option<StorageMode> {
        if is_auth_path(path) || !is_api_path(path) {
            return None;
        }

        if self.mode.current() == StorageMode::Degraded {
            return Some(StorageMode::Degraded);
        }

        let state = observe_state(self.monitor.as_ref());
        if state.is_connected() {
            return Some(StorageMode::Durable);
        }

        if self.mode.degrade() {
            tracing::warn!(
                connection_state = state.code(),
                connection_label = %state,
                path = %path,
                "Database not connected, switching to in-memory storage"
            );
            metrics::record_mode_switch();
        }
        Some(StorageMode::Degraded)
    }
}

fn is_auth_path(path: &str) -> bool {
    let trimmed = path.trim_end_matches('/');
    AUTH_PATHS.contains(&trimmed)
}

fn is_api_path(path: &str) -> bool {
    path == API_PREFIX
        || path
            .strip_prefix(API_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Middleware entry point.
pub async fn health_gate_middleware(
    State(gate): State<HealthGate>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(mode) = gate.resolve(request.uri().path()) {
        request.extensions_mut().insert(StorageContext { mode });
    }
    next.run(request).await
}
