//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use blog_api::health::{ConnectionMonitor, ConnectionState, MonitorError};
use blog_api::storage::memory::MemoryStore;
use blog_api::storage::Storage;
use blog_api::{AppState, BlogConfig, HttpServer};

pub const API_KEY: &str = "test-api-key";

/// Connection monitor whose state the test controls.
pub struct ScriptedMonitor {
    state: AtomicU8,
    queries: AtomicUsize,
}

impl ScriptedMonitor {
    pub fn new(state: ConnectionState) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(state.code()),
            queries: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, state: ConnectionState) {
        self.state.store(state.code(), Ordering::SeqCst);
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl ConnectionMonitor for ScriptedMonitor {
    fn current_state(&self) -> Result<ConnectionState, MonitorError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(ConnectionState::from(self.state.load(Ordering::SeqCst)))
    }
}

/// An in-process app where two independent memory stores play the
/// durable and degraded backends.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub monitor: Arc<ScriptedMonitor>,
    pub durable: Arc<MemoryStore>,
    pub memory: Arc<MemoryStore>,
}

pub fn test_config() -> BlogConfig {
    let mut config = BlogConfig::default();
    config.admin.api_key = API_KEY.to_string();
    config.admin.username = "editor".to_string();
    config.admin.password = "hunter2".to_string();
    config
}

pub fn spawn_app(initial: ConnectionState) -> TestApp {
    let monitor = ScriptedMonitor::new(initial);
    let durable = Arc::new(MemoryStore::new());
    let memory = Arc::new(MemoryStore::new());
    let storage = Storage::new(durable.clone(), memory.clone());

    let state = AppState::new(test_config(), storage, monitor.clone());
    let server = HttpServer::new(state.clone());

    TestApp {
        router: server.router(),
        state,
        monitor,
        durable,
        memory,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn admin_get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(API_KEY), None).await
    }

    pub async fn admin_post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(API_KEY), Some(body)).await
    }
}

pub fn post_body(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "content": format!("Everything about {}", title),
        "category": "engineering",
        "tags": ["rust", "storage"],
        "status": "published"
    })
}
