//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! Request stamped by the health gate (StorageContext)
//!     → Storage::bind(mode)          (once per request)
//!     → BoundStorage                 (threaded through the handler)
//!     → postgres.rs | memory.rs      (exactly one backend per request)
//! ```
//!
//! # Design Decisions
//! - Both backends implement one trait and return identically shaped records
//! - No reconciliation: writes made in one backend are invisible to the other
//! - The facade never retries or fails over; backend faults surface as errors

pub mod memory;
pub mod model;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::health::mode::StorageMode;
use crate::observability::metrics;
use self::model::{NewPost, NewSubscriber, Post, PostFilter, PostUpdate, Subscriber};

/// Errors returned by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested record does not exist.
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The input was rejected by the backend.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// No backend is configured for the selected mode.
    #[error("storage backend unavailable")]
    Unavailable,

    /// The backend failed while executing the operation.
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Operations every storage backend provides.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logs and metrics.
    fn label(&self) -> &'static str;

    async fn list_posts(&self, filter: &PostFilter) -> StorageResult<Vec<Post>>;

    /// Number of posts matching the filter, ignoring limit and offset.
    async fn count_posts(&self, filter: &PostFilter) -> StorageResult<u64>;

    async fn get_post(&self, id: Uuid) -> StorageResult<Option<Post>>;

    async fn get_post_by_slug(&self, slug: &str) -> StorageResult<Option<Post>>;

    async fn create_post(&self, post: NewPost) -> StorageResult<Post>;

    /// Returns `None` when no post has the given id.
    async fn update_post(&self, id: Uuid, update: PostUpdate) -> StorageResult<Option<Post>>;

    /// Returns `true` if a post was removed.
    async fn delete_post(&self, id: Uuid) -> StorageResult<bool>;

    async fn create_subscriber(&self, subscriber: NewSubscriber) -> StorageResult<Subscriber>;

    async fn list_subscribers(&self) -> StorageResult<Vec<Subscriber>>;

    async fn find_subscriber(&self, email: &str) -> StorageResult<Option<Subscriber>>;
}

/// Facade over the durable and memory backends.
#[derive(Clone)]
pub struct Storage {
    durable: Option<Arc<dyn StorageBackend>>,
    memory: Arc<dyn StorageBackend>,
}

impl Storage {
    pub fn new(durable: Arc<dyn StorageBackend>, memory: Arc<dyn StorageBackend>) -> Self {
        Self {
            durable: Some(durable),
            memory,
        }
    }

    /// Facade with no durable backend configured.
    pub fn memory_only(memory: Arc<dyn StorageBackend>) -> Self {
        Self {
            durable: None,
            memory,
        }
    }

    /// Select the backend for one request.
    pub fn bind(&self, mode: StorageMode) -> BoundStorage {
        let backend = match mode {
            StorageMode::Durable => self.durable.clone(),
            StorageMode::Degraded => Some(self.memory.clone()),
        };
        BoundStorage { mode, backend }
    }
}

/// Storage bound to a single backend for the lifetime of one request.
#[derive(Clone)]
pub struct BoundStorage {
    mode: StorageMode,
    backend: Option<Arc<dyn StorageBackend>>,
}

impl BoundStorage {
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    fn backend(&self) -> StorageResult<&dyn StorageBackend> {
        self.backend.as_deref().ok_or(StorageError::Unavailable)
    }

    fn observe<T>(&self, operation: &'static str, result: StorageResult<T>) -> StorageResult<T> {
        if let Err(StorageError::Backend(ref e)) = result {
            let backend = self.backend.as_deref().map_or("none", |b| b.label());
            tracing::error!(backend, operation, error = %e, "Storage operation failed");
            metrics::record_storage_error(backend, operation);
        }
        result
    }

    pub async fn list_posts(&self, filter: &PostFilter) -> StorageResult<Vec<Post>> {
        let result = self.backend()?.list_posts(filter).await;
        self.observe("list_posts", result)
    }

    pub async fn count_posts(&self, filter: &PostFilter) -> StorageResult<u64> {
        let result = self.backend()?.count_posts(filter).await;
        self.observe("count_posts", result)
    }

    pub async fn get_post(&self, id: Uuid) -> StorageResult<Option<Post>> {
        let result = self.backend()?.get_post(id).await;
        self.observe("get_post", result)
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> StorageResult<Option<Post>> {
        let result = self.backend()?.get_post_by_slug(slug).await;
        self.observe("get_post_by_slug", result)
    }

    pub async fn create_post(&self, post: NewPost) -> StorageResult<Post> {
        let result = self.backend()?.create_post(post).await;
        self.observe("create_post", result)
    }

    pub async fn update_post(&self, id: Uuid, update: PostUpdate) -> StorageResult<Option<Post>> {
        let result = self.backend()?.update_post(id, update).await;
        self.observe("update_post", result)
    }

    pub async fn delete_post(&self, id: Uuid) -> StorageResult<bool> {
        let result = self.backend()?.delete_post(id).await;
        self.observe("delete_post", result)
    }

    pub async fn create_subscriber(&self, subscriber: NewSubscriber) -> StorageResult<Subscriber> {
        let result = self.backend()?.create_subscriber(subscriber).await;
        self.observe("create_subscriber", result)
    }

    pub async fn list_subscribers(&self) -> StorageResult<Vec<Subscriber>> {
        let result = self.backend()?.list_subscribers().await;
        self.observe("list_subscribers", result)
    }

    pub async fn find_subscriber(&self, email: &str) -> StorageResult<Option<Subscriber>> {
        let result = self.backend()?.find_subscriber(email).await;
        self.observe("find_subscriber", result)
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::model::PostStatus;
    use super::*;

    fn new_post(title: &str) -> NewPost {
        NewPost {
            title: title.into(),
            slug: None,
            excerpt: None,
            content: "body".into(),
            category: "general".into(),
            tags: Vec::new(),
            status: PostStatus::Published,
            author: "admin".into(),
        }
    }

    #[tokio::test]
    async fn test_bind_routes_to_selected_backend() {
        let durable = Arc::new(MemoryStore::new());
        let memory = Arc::new(MemoryStore::new());
        let storage = Storage::new(durable.clone(), memory.clone());

        let created = storage
            .bind(StorageMode::Durable)
            .create_post(new_post("Durable only"))
            .await
            .unwrap();

        assert!(durable.get_post(created.id).await.unwrap().is_some());
        assert!(memory.get_post(created.id).await.unwrap().is_none());

        let degraded = storage.bind(StorageMode::Degraded);
        assert_eq!(degraded.mode(), StorageMode::Degraded);
        assert!(degraded.get_post(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_only_durable_is_unavailable() {
        let storage = Storage::memory_only(Arc::new(MemoryStore::new()));
        let err = storage
            .bind(StorageMode::Durable)
            .list_posts(&PostFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable));

        let posts = storage
            .bind(StorageMode::Degraded)
            .list_posts(&PostFilter::default())
            .await
            .unwrap();
        assert!(posts.is_empty());
    }
}
