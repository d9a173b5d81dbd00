//! In-memory storage backend.
//!
//! Serves requests while the database is unreachable. Nothing here survives a
//! restart and nothing is copied to the database when it comes back.
//!
//! Slugs and emails are claimed through index maps so two concurrent writers
//! can never both win the same key.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::storage::model::{
    self, normalize_email, NewPost, NewSubscriber, Post, PostFilter, PostUpdate, Subscriber,
};
use crate::storage::{StorageBackend, StorageError, StorageResult};

/// Process-local post and subscriber store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: DashMap<Uuid, Post>,
    slugs: DashMap<String, Uuid>,
    subscribers: DashMap<Uuid, Subscriber>,
    emails: DashMap<String, Uuid>,
}

fn slug_conflict(slug: &str) -> StorageError {
    StorageError::Conflict(format!("slug '{}' already exists", slug))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `slug` for `id`. Succeeds if the slug is free or already owned by `id`.
    fn claim_slug(&self, slug: &str, id: Uuid) -> StorageResult<()> {
        match self.slugs.entry(slug.to_string()) {
            Entry::Occupied(owner) if *owner.get() != id => Err(slug_conflict(slug)),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Ok(())
            }
        }
    }

    fn release_slug(&self, slug: &str, id: Uuid) {
        self.slugs.remove_if(slug, |_, owner| *owner == id);
    }

    fn matching(&self, filter: &PostFilter) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        posts.sort_by(|a, b| {
            let a_key = a.published_at.unwrap_or(a.created_at);
            let b_key = b.published_at.unwrap_or(b.created_at);
            b_key.cmp(&a_key)
        });
        posts
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    fn label(&self) -> &'static str {
        "memory"
    }

    async fn list_posts(&self, filter: &PostFilter) -> StorageResult<Vec<Post>> {
        Ok(self
            .matching(filter)
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn count_posts(&self, filter: &PostFilter) -> StorageResult<u64> {
        let count = self
            .posts
            .iter()
            .filter(|r| filter.matches(r.value()))
            .count();
        Ok(count as u64)
    }

    async fn get_post(&self, id: Uuid) -> StorageResult<Option<Post>> {
        Ok(self.posts.get(&id).map(|r| r.value().clone()))
    }

    async fn get_post_by_slug(&self, slug: &str) -> StorageResult<Option<Post>> {
        let Some(id) = self.slugs.get(slug).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.posts.get(&id).map(|r| r.value().clone()))
    }

    async fn create_post(&self, post: NewPost) -> StorageResult<Post> {
        let post = post.into_post(model::now());
        if post.slug.is_empty() {
            return Err(StorageError::Invalid("post slug is empty".into()));
        }
        self.claim_slug(&post.slug, post.id)?;
        self.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, update: PostUpdate) -> StorageResult<Option<Post>> {
        let Some(mut post) = self.posts.get(&id).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        let old_slug = post.slug.clone();
        update.apply(&mut post, model::now());
        if post.slug.is_empty() {
            return Err(StorageError::Invalid("post slug is empty".into()));
        }
        if post.slug != old_slug {
            self.claim_slug(&post.slug, id)?;
            self.release_slug(&old_slug, id);
        }
        self.posts.insert(id, post.clone());
        Ok(Some(post))
    }

    async fn delete_post(&self, id: Uuid) -> StorageResult<bool> {
        match self.posts.remove(&id) {
            Some((_, post)) => {
                self.release_slug(&post.slug, id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_subscriber(&self, subscriber: NewSubscriber) -> StorageResult<Subscriber> {
        let subscriber = subscriber.into_subscriber(model::now());
        match self.emails.entry(subscriber.email.clone()) {
            Entry::Occupied(_) => {
                return Err(StorageError::Conflict(format!(
                    "{} is already subscribed",
                    subscriber.email
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(subscriber.id);
            }
        }
        self.subscribers.insert(subscriber.id, subscriber.clone());
        Ok(subscriber)
    }

    async fn list_subscribers(&self) -> StorageResult<Vec<Subscriber>> {
        let mut subscribers: Vec<Subscriber> =
            self.subscribers.iter().map(|r| r.value().clone()).collect();
        subscribers.sort_by(|a, b| b.subscribed_at.cmp(&a.subscribed_at));
        Ok(subscribers)
    }

    async fn find_subscriber(&self, email: &str) -> StorageResult<Option<Subscriber>> {
        let Some(id) = self.emails.get(&normalize_email(email)).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.subscribers.get(&id).map(|r| r.value().clone()))
    }
}
