//! Domain records passed through the storage facade.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Publication status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("unknown post status: {}", other)),
        }
    }
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Input for creating a post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default = "default_author")]
    pub author: String,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_author() -> String {
    "admin".to_string()
}

impl NewPost {
    /// Build the stored record, deriving slug and excerpt where absent.
    pub fn into_post(self, now: DateTime<Utc>) -> Post {
        let slug = match self.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => slugify(s),
            _ => slugify(&self.title),
        };
        let excerpt = self
            .excerpt
            .unwrap_or_else(|| make_excerpt(&self.content));
        let published_at = (self.status == PostStatus::Published).then_some(now);

        Post {
            id: Uuid::new_v4(),
            title: self.title,
            slug,
            excerpt,
            content: self.content,
            category: self.category,
            tags: self.tags,
            status: self.status,
            author: self.author,
            created_at: now,
            updated_at: now,
            published_at,
        }
    }
}

/// Partial update for a post.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<PostStatus>,
    pub author: Option<String>,
}

impl PostUpdate {
    /// Apply the update in place.
    pub fn apply(self, post: &mut Post, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(slug) = self.slug {
            post.slug = slugify(&slug);
        }
        if let Some(excerpt) = self.excerpt {
            post.excerpt = excerpt;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(category) = self.category {
            post.category = category;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(author) = self.author {
            post.author = author;
        }
        if let Some(status) = self.status {
            post.status = status;
            if status == PostStatus::Published && post.published_at.is_none() {
                post.published_at = Some(now);
            }
        }
        post.updated_at = now;
    }
}

/// Listing filter shared by list and count operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            status: None,
            category: None,
            search: None,
            limit: 10,
            offset: 0,
        }
    }
}

impl PostFilter {
    /// Whether a post satisfies the status/category/search predicates.
    pub fn matches(&self, post: &Post) -> bool {
        if self.status.is_some_and(|s| s != post.status) {
            return false;
        }
        if self
            .category
            .as_deref()
            .is_some_and(|c| !c.eq_ignore_ascii_case(&post.category))
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                post.title.to_lowercase().contains(&q)
                    || post.excerpt.to_lowercase().contains(&q)
                    || post.content.to_lowercase().contains(&q)
                    || post.tags.iter().any(|t| t.to_lowercase().contains(&q))
            }
            _ => true,
        }
    }
}

/// A newsletter subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub subscribed_at: DateTime<Utc>,
    pub active: bool,
}

/// Input for a new subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubscriber {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl NewSubscriber {
    pub fn into_subscriber(self, now: DateTime<Utc>) -> Subscriber {
        Subscriber {
            id: Uuid::new_v4(),
            email: normalize_email(&self.email),
            name: self.name,
            subscribed_at: now,
            active: true,
        }
    }
}

/// Current time truncated to microseconds, the precision Postgres stores.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lower-case, hyphen-separated URL slug.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

const EXCERPT_CHARS: usize = 160;

fn make_excerpt(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: PostStatus) -> NewPost {
        NewPost {
            title: "Hello, World!".into(),
            slug: None,
            excerpt: None,
            content: "Rust makes failover boring.".into(),
            category: "engineering".into(),
            tags: vec!["rust".into()],
            status,
            author: "ana".into(),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  --Already-Sluggy--  "), "already-sluggy");
        assert_eq!(slugify("Ünïcode Títle 2"), "ünïcode-títle-2");
    }

    #[test]
    fn test_into_post_derives_fields() {
        let now = Utc::now();
        let post = sample(PostStatus::Published).into_post(now);
        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.excerpt, "Rust makes failover boring.");
        assert_eq!(post.published_at, Some(now));

        let draft = sample(PostStatus::Draft).into_post(now);
        assert!(draft.published_at.is_none());
    }

    #[test]
    fn test_publish_stamps_once() {
        let created = Utc::now();
        let mut post = sample(PostStatus::Draft).into_post(created);
        let later = created + chrono::Duration::seconds(5);
        PostUpdate {
            status: Some(PostStatus::Published),
            ..Default::default()
        }
        .apply(&mut post, later);
        assert_eq!(post.published_at, Some(later));

        let even_later = later + chrono::Duration::seconds(5);
        PostUpdate {
            title: Some("New".into()),
            status: Some(PostStatus::Published),
            ..Default::default()
        }
        .apply(&mut post, even_later);
        assert_eq!(post.published_at, Some(later));
        assert_eq!(post.updated_at, even_later);
        assert_eq!(post.slug, "hello-world");
    }

    #[test]
    fn test_filter_matches() {
        let post = sample(PostStatus::Published).into_post(Utc::now());
        let mut filter = PostFilter::default();
        assert!(filter.matches(&post));

        filter.search = Some("FAILOVER".into());
        assert!(filter.matches(&post));

        filter.category = Some("news".into());
        assert!(!filter.matches(&post));

        let drafts = PostFilter {
            status: Some(PostStatus::Draft),
            ..Default::default()
        };
        assert!(!drafts.matches(&post));
    }

    #[test]
    fn test_now_has_microsecond_precision() {
        let stamp = now();
        assert_eq!(stamp.timestamp_subsec_nanos() % 1_000, 0);

        let post = sample(PostStatus::Published).into_post(stamp);
        assert_eq!(post.created_at.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(post.published_at, Some(stamp));
    }

    #[test]
    fn test_long_content_excerpt_is_truncated() {
        let mut input = sample(PostStatus::Draft);
        input.content = "word ".repeat(100);
        let post = input.into_post(Utc::now());
        assert!(post.excerpt.ends_with("..."));
        assert!(post.excerpt.chars().count() <= EXCERPT_CHARS + 3);
    }
}
