//! Newsletter subscription handlers.

use axum::{http::StatusCode, Json};

use crate::http::request::RequestStorage;
use crate::http::response::ApiError;
use crate::storage::model::{NewSubscriber, Subscriber};

fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

pub async fn subscribe(
    RequestStorage(storage): RequestStorage,
    Json(body): Json<NewSubscriber>,
) -> Result<(StatusCode, Json<Subscriber>), ApiError> {
    if !looks_like_email(&body.email) {
        return Err(ApiError::BadRequest("a valid email is required".into()));
    }
    if storage.find_subscriber(&body.email).await?.is_some() {
        return Err(ApiError::Conflict("already subscribed".into()));
    }

    let subscriber = storage.create_subscriber(body).await?;
    tracing::info!(id = %subscriber.id, backend = %storage.mode(), "New subscriber");
    Ok((StatusCode::CREATED, Json(subscriber)))
}

pub async fn list(RequestStorage(storage): RequestStorage) -> Result<Json<Vec<Subscriber>>, ApiError> {
    Ok(Json(storage.list_subscribers().await?))
}
