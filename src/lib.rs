//! Blog content API with automatic storage failover.

pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod storage;

pub use config::BlogConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
