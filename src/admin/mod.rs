//! Operator endpoints.
//!
//! Mounted under `/admin`, outside the `/api` namespace, so the health gate
//! never runs for them: observing storage health cannot change it.

pub mod handlers;

use axum::{middleware, routing::get, Router};

use crate::auth::require_admin;
use crate::http::server::AppState;
use self::handlers::{get_diagnostics, get_status};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/diagnostics", get(get_diagnostics))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}
