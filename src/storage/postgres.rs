//! Durable storage backend on PostgreSQL.
//!
//! # Responsibilities
//! - Own the lazily-connected `PgPool`
//! - Create the schema idempotently once the database is reachable
//! - Map rows to the shared domain records
//!
//! # Design Decisions
//! - Pool is created with `connect_lazy_with` so startup never blocks on the database
//! - Search uses Postgres full-text matching, unlike the substring match in memory
//! - Unique violations map to `StorageError::Conflict`; all other driver errors are generic

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::storage::model::{
    self, normalize_email, NewPost, NewSubscriber, Post, PostFilter, PostStatus, PostUpdate, Subscriber,
};
use crate::storage::{StorageBackend, StorageError, StorageResult};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS posts (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        excerpt TEXT NOT NULL,
        content TEXT NOT NULL,
        category TEXT NOT NULL,
        tags TEXT[] NOT NULL DEFAULT '{}',
        status TEXT NOT NULL,
        author TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        published_at TIMESTAMPTZ
    )"#,
    "CREATE INDEX IF NOT EXISTS posts_status_idx ON posts (status, published_at DESC)",
    r#"CREATE TABLE IF NOT EXISTS subscribers (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT,
        subscribed_at TIMESTAMPTZ NOT NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE
    )"#,
];

const POST_COLUMNS: &str = "id, title, slug, excerpt, content, category, tags, status, author, \
     created_at, updated_at, published_at";

const SEARCH_VECTOR: &str =
    "to_tsvector('english', title || ' ' || excerpt || ' ' || content)";

/// Postgres `BIGINT` for a limit or offset; values past `i64::MAX` saturate.
fn to_sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::Conflict(db.message().to_string())
            }
            _ => StorageError::Backend(err.to_string()),
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    slug: String,
    excerpt: String,
    content: String,
    category: String,
    tags: Vec<String>,
    status: String,
    author: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
}

impl TryFrom<PostRow> for Post {
    type Error = StorageError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let status: PostStatus = row.status.parse().map_err(StorageError::Backend)?;
        Ok(Post {
            id: row.id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            content: row.content,
            category: row.category,
            tags: row.tags,
            status,
            author: row.author,
            created_at: row.created_at,
            updated_at: row.updated_at,
            published_at: row.published_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    subscribed_at: DateTime<Utc>,
    active: bool,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Subscriber {
            id: row.id,
            email: row.email,
            name: row.name,
            subscribed_at: row.subscribed_at,
            active: row.active,
        }
    }
}

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store whose pool connects on first use.
    pub fn connect_lazy(config: &DatabaseConfig, url: &str) -> Result<Self, sqlx::Error> {
        let options: PgConnectOptions = url.parse()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_lazy_with(options);
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a PostFilter) {
        builder.push(" WHERE TRUE");
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(category) = filter.category.as_deref() {
            builder.push(" AND lower(category) = lower(").push_bind(category).push(")");
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder
                .push(" AND ")
                .push(SEARCH_VECTOR)
                .push(" @@ plainto_tsquery('english', ")
                .push_bind(search)
                .push(")");
        }
    }

    async fn write_post(&self, post: &Post, insert: bool) -> StorageResult<()> {
        let sql = if insert {
            "INSERT INTO posts (id, title, slug, excerpt, content, category, tags, status, author, \
             created_at, updated_at, published_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        } else {
            "UPDATE posts SET title = $2, slug = $3, excerpt = $4, content = $5, category = $6, \
             tags = $7, status = $8, author = $9, created_at = $10, updated_at = $11, \
             published_at = $12 WHERE id = $1"
        };
        sqlx::query(sql)
            .bind(post.id)
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.category)
            .bind(&post.tags)
            .bind(post.status.as_str())
            .bind(&post.author)
            .bind(post.created_at)
            .bind(post.updated_at)
            .bind(post.published_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for PgStore {
    fn label(&self) -> &'static str {
        "postgres"
    }

    async fn list_posts(&self, filter: &PostFilter) -> StorageResult<Vec<Post>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(POST_COLUMNS).push(" FROM posts");
        Self::push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY COALESCE(published_at, created_at) DESC LIMIT ")
            .push_bind(to_sql_int(filter.limit))
            .push(" OFFSET ")
            .push_bind(to_sql_int(filter.offset));

        let rows: Vec<PostRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Post::try_from).collect()
    }

    async fn count_posts(&self, filter: &PostFilter) -> StorageResult<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts");
        Self::push_filter(&mut builder, filter);
        let (count,): (i64,) = builder.build_query_as().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn get_post(&self, id: Uuid) -> StorageResult<Option<Post>> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Post::try_from).transpose()
    }

    async fn get_post_by_slug(&self, slug: &str) -> StorageResult<Option<Post>> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("SELECT {} FROM posts WHERE slug = $1", POST_COLUMNS))
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Post::try_from).transpose()
    }

    async fn create_post(&self, post: NewPost) -> StorageResult<Post> {
        let post = post.into_post(model::now());
        if post.slug.is_empty() {
            return Err(StorageError::Invalid("post slug is empty".into()));
        }
        self.write_post(&post, true).await?;
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, update: PostUpdate) -> StorageResult<Option<Post>> {
        let Some(mut post) = self.get_post(id).await? else {
            return Ok(None);
        };
        update.apply(&mut post, model::now());
        if post.slug.is_empty() {
            return Err(StorageError::Invalid("post slug is empty".into()));
        }
        self.write_post(&post, false).await?;
        Ok(Some(post))
    }

    async fn delete_post(&self, id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_subscriber(&self, subscriber: NewSubscriber) -> StorageResult<Subscriber> {
        let subscriber = subscriber.into_subscriber(model::now());
        sqlx::query(
            "INSERT INTO subscribers (id, email, name, subscribed_at, active) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(subscriber.id)
        .bind(&subscriber.email)
        .bind(&subscriber.name)
        .bind(subscriber.subscribed_at)
        .bind(subscriber.active)
        .execute(&self.pool)
        .await?;
        Ok(subscriber)
    }

    async fn list_subscribers(&self) -> StorageResult<Vec<Subscriber>> {
        let rows: Vec<SubscriberRow> = sqlx::query_as(
            "SELECT id, email, name, subscribed_at, active FROM subscribers \
             ORDER BY subscribed_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    async fn find_subscriber(&self, email: &str) -> StorageResult<Option<Subscriber>> {
        let row: Option<SubscriberRow> = sqlx::query_as(
            "SELECT id, email, name, subscribed_at, active FROM subscribers WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Subscriber::from))
    }
}
