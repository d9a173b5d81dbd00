//! Per-request plumbing.
//!
//! # Responsibilities
//! - Generate and propagate `x-request-id`
//! - Build the request span used by the trace layer
//! - Count requests by method and status
//! - Bind the storage backend chosen by the health gate
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Storage is bound once per request and passed explicitly to every call

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, HeaderName, Request},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

use crate::health::gate::StorageContext;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::storage::BoundStorage;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Span for the trace layer, tagged with the request ID.
pub fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}

pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16());
    response
}

/// Storage bound to the backend chosen for this request.
pub struct RequestStorage(pub BoundStorage);

impl FromRequestParts<AppState> for RequestStorage {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Routes outside the gate fall back to the process-wide mode.
        let mode = parts
            .extensions
            .get::<StorageContext>()
            .map(|ctx| ctx.mode)
            .unwrap_or_else(|| state.mode.current());
        Ok(Self(state.storage.bind(mode)))
    }
}
