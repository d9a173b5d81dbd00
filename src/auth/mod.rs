//! Authentication for admin routes.
//!
//! # Responsibilities
//! - Issue, validate and revoke in-memory sessions (session.rs)
//! - Login / logout / current-user handlers (handlers.rs)
//! - Guard admin routes with a session token or the static API key (middleware.rs)
//!
//! # Design Decisions
//! - Sessions never touch the storage facade, so auth keeps working with storage down
//! - Credentials are read from the live configuration on every check

pub mod handlers;
pub mod middleware;
pub mod session;

pub use middleware::require_admin;
pub use session::SessionStore;

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
