//! Admin route guard.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::bearer_token;
use crate::http::response::ApiError;
use crate::http::server::AppState;

/// Name of the authenticated principal, attached to guarded requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity(pub String);

/// Resolve a bearer token to an admin identity.
pub fn authenticate(state: &AppState, token: &str) -> Option<AdminIdentity> {
    let config = state.config.load();
    if token == config.admin.api_key {
        return Some(AdminIdentity("api-key".to_string()));
    }
    state.sessions.validate(token).map(AdminIdentity)
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let identity = bearer_token(request.headers()).and_then(|t| authenticate(&state, t));

    match identity {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => ApiError::Unauthorized.into_response(),
    }
}
