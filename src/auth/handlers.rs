//! Login, logout and current-user handlers.
//!
//! These paths are exempt from the health gate and must not use storage.

use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::bearer_token;
use crate::auth::middleware::authenticate;
use crate::http::response::ApiError;
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub username: String,
    pub authenticated: bool,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let config = state.config.load();
    let admin = &config.admin;

    if body.username != admin.username || body.password != admin.password {
        tracing::warn!(username = %body.username, "Rejected admin login");
        return Err(ApiError::Unauthorized);
    }

    let token = state
        .sessions
        .create(&admin.username, Duration::from_secs(admin.session_ttl_secs));
    tracing::info!(username = %admin.username, "Admin logged in");

    Ok(Json(LoginResponse {
        token,
        username: admin.username.clone(),
        expires_in: admin.session_ttl_secs,
    }))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token);
    }
    StatusCode::NO_CONTENT
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CurrentUser>, ApiError> {
    let identity = bearer_token(&headers)
        .and_then(|t| authenticate(&state, t))
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(CurrentUser {
        username: identity.0,
        authenticated: true,
    }))
}
