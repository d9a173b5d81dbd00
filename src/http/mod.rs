//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, span, metrics)
//!     → health gate (stamps StorageContext on /api requests)
//!     → api / auth / admin handlers
//!     → response.rs (errors as JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestStorage, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
