//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! blog.toml + environment (DATABASE_URL, BLOG_ENV, BLOG_BIND_ADDRESS)
//!     → loader.rs (parse, apply overrides)
//!     → validation.rs (semantic checks)
//!     → BlogConfig (validated)
//!     → shared via Arc<ArcSwap<BlogConfig>>
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads + validates
//!     → atomic swap of the live config
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow an empty or missing file
//! - Validation separates syntactic (serde) from semantic checks
//! - A rejected reload never replaces the running configuration

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{
    AdminConfig, BlogConfig, DatabaseConfig, Environment, ListenerConfig, ObservabilityConfig,
    PaginationConfig,
};
