//! Blog API route handlers.
//!
//! Thin glue between HTTP and the storage facade. Every handler takes a
//! `RequestStorage`, so all storage calls of one request hit the same backend.

pub mod posts;
pub mod subscribers;

use axum::{
    middleware,
    routing::get,
    Router,
};

use crate::auth::require_admin;
use crate::http::server::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/posts", get(posts::list_published))
        .route("/api/posts/{key}", get(posts::get_published))
        .route("/api/subscribe", axum::routing::post(subscribers::subscribe));

    let admin = Router::new()
        .route("/api/admin/posts", get(posts::list_all).post(posts::create))
        .route(
            "/api/admin/posts/{id}",
            get(posts::get_any).put(posts::update).delete(posts::remove),
        )
        .route("/api/admin/subscribers", get(subscribers::list))
        .route("/api/admin/stats", get(posts::stats))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    public.merge(admin)
}
