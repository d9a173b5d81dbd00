//! Post handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::request::RequestStorage;
use crate::http::response::ApiError;
use crate::config::PaginationConfig;
use crate::http::server::AppState;
use crate::storage::model::{NewPost, Post, PostFilter, PostStatus, PostUpdate};
use crate::storage::BoundStorage;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<PostStatus>,
    pub category: Option<String>,
    #[serde(alias = "q")]
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Largest offset any backend can page to.
const MAX_OFFSET: usize = i64::MAX as usize;

impl ListQuery {
    fn into_filter(self, pagination: &PaginationConfig) -> PostFilter {
        let limit = self
            .limit
            .unwrap_or(pagination.default_limit)
            .clamp(1, pagination.max_limit);

        PostFilter {
            status: self.status,
            category: self.category.filter(|c| !c.trim().is_empty()),
            search: self.search.filter(|s| !s.trim().is_empty()),
            limit,
            offset: self.offset.unwrap_or(0).min(MAX_OFFSET),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub posts: u64,
    pub published: u64,
    pub drafts: u64,
    pub subscribers: usize,
}

async fn page(storage: &BoundStorage, filter: PostFilter) -> Result<PostPage, ApiError> {
    let posts = storage.list_posts(&filter).await?;
    let total = storage.count_posts(&filter).await?;
    Ok(PostPage {
        posts,
        total,
        limit: filter.limit,
        offset: filter.offset,
    })
}

async fn find(storage: &BoundStorage, key: &str) -> Result<Option<Post>, ApiError> {
    let post = match Uuid::parse_str(key) {
        Ok(id) => storage.get_post(id).await?,
        Err(_) => storage.get_post_by_slug(key).await?,
    };
    Ok(post)
}

fn validate_new(post: &NewPost) -> Result<(), ApiError> {
    if post.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }
    if post.content.trim().is_empty() {
        return Err(ApiError::BadRequest("content is required".into()));
    }
    Ok(())
}

pub async fn list_published(
    State(state): State<AppState>,
    RequestStorage(storage): RequestStorage,
    Query(query): Query<ListQuery>,
) -> Result<Json<PostPage>, ApiError> {
    let mut filter = query.into_filter(&state.config.load().pagination);
    filter.status = Some(PostStatus::Published);
    Ok(Json(page(&storage, filter).await?))
}

pub async fn get_published(
    RequestStorage(storage): RequestStorage,
    Path(key): Path<String>,
) -> Result<Json<Post>, ApiError> {
    find(&storage, &key)
        .await?
        .filter(|p| p.status == PostStatus::Published)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("post not found".into()))
}

pub async fn list_all(
    State(state): State<AppState>,
    RequestStorage(storage): RequestStorage,
    Query(query): Query<ListQuery>,
) -> Result<Json<PostPage>, ApiError> {
    let filter = query.into_filter(&state.config.load().pagination);
    Ok(Json(page(&storage, filter).await?))
}

pub async fn get_any(
    RequestStorage(storage): RequestStorage,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, ApiError> {
    storage
        .get_post(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("post not found".into()))
}

pub async fn create(
    RequestStorage(storage): RequestStorage,
    Json(body): Json<NewPost>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    validate_new(&body)?;
    let post = storage.create_post(body).await?;
    tracing::info!(id = %post.id, slug = %post.slug, backend = %storage.mode(), "Post created");
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update(
    RequestStorage(storage): RequestStorage,
    Path(id): Path<Uuid>,
    Json(body): Json<PostUpdate>,
) -> Result<Json<Post>, ApiError> {
    if body.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::BadRequest("title must not be empty".into()));
    }
    storage
        .update_post(id, body)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("post not found".into()))
}

pub async fn remove(
    RequestStorage(storage): RequestStorage,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if storage.delete_post(id).await? {
        tracing::info!(id = %id, backend = %storage.mode(), "Post deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("post not found".into()))
    }
}

pub async fn stats(RequestStorage(storage): RequestStorage) -> Result<Json<Stats>, ApiError> {
    let all = PostFilter::default();
    let published = PostFilter {
        status: Some(PostStatus::Published),
        ..Default::default()
    };
    let drafts = PostFilter {
        status: Some(PostStatus::Draft),
        ..Default::default()
    };

    Ok(Json(Stats {
        posts: storage.count_posts(&all).await?,
        published: storage.count_posts(&published).await?,
        drafts: storage.count_posts(&drafts).await?,
        subscribers: storage.list_subscribers().await?.len(),
    }))
}
