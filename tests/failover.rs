//! Storage failover behaviour, end to end through the router.

use axum::http::{Method, StatusCode};
use serde_json::json;

use blog_api::health::{ConnectionState, StorageMode};
use blog_api::storage::model::PostFilter;
use blog_api::storage::StorageBackend;

mod common;

use common::{post_body, spawn_app, API_KEY};

#[tokio::test]
async fn test_disconnected_first_request_serves_from_memory() {
    let app = spawn_app(ConnectionState::Disconnected);

    let (status, body) = app.get("/api/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["posts"].as_array().unwrap().is_empty());
    assert_eq!(body["total"], 0);
    assert_eq!(app.state.mode.current(), StorageMode::Degraded);

    let (status, diag) = app.admin_get("/admin/diagnostics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(diag["storageMode"], "memory");
    assert_eq!(diag["connectionState"], 0);
    assert_eq!(diag["connectionLabel"], "disconnected");
    assert!(diag["uptimeSeconds"].is_u64());
    assert!(diag["heapUsedMB"].is_number());
    assert!(diag["heapTotalMB"].is_number());
    assert_eq!(diag["environment"], "development");
}

#[tokio::test]
async fn test_degraded_mode_is_sticky() {
    let app = spawn_app(ConnectionState::Connecting);

    app.get("/api/posts").await;
    assert_eq!(app.state.mode.current(), StorageMode::Degraded);
    assert_eq!(app.monitor.queries(), 1);

    app.monitor.set(ConnectionState::Connected);
    for _ in 0..3 {
        let (status, _) = app.get("/api/posts").await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.state.mode.current(), StorageMode::Degraded);
    assert_eq!(app.monitor.queries(), 1, "degraded mode must not re-probe");
}

#[tokio::test]
async fn test_connected_requests_use_durable_backend() {
    let app = spawn_app(ConnectionState::Connected);

    let (status, created) = app.admin_post("/api/admin/posts", post_body("Durable Days")).await;
    assert_eq!(status, StatusCode::CREATED);

    let filter = PostFilter::default();
    assert_eq!(app.durable.count_posts(&filter).await.unwrap(), 1);
    assert_eq!(app.memory.count_posts(&filter).await.unwrap(), 0);
    assert_eq!(app.state.mode.current(), StorageMode::Durable);

    let (status, fetched) = app.get(&format!("/api/posts/{}", created["slug"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
}

#[tokio::test]
async fn test_auth_routes_bypass_the_gate() {
    let app = spawn_app(ConnectionState::Disconnected);

    let (status, login) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "editor", "password": "hunter2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap().to_string();

    let (status, me) = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "editor");

    let (status, _) = app.request(Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.monitor.queries(), 0);
    assert_eq!(app.state.mode.current(), StorageMode::Durable);
}

#[tokio::test]
async fn test_rejected_login() {
    let app = spawn_app(ConnectionState::Connected);
    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "editor", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_non_api_paths_bypass_the_gate() {
    let app = spawn_app(ConnectionState::Disconnected);

    let (status, _) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/static/logo.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.monitor.queries(), 0);
    assert_eq!(app.state.mode.current(), StorageMode::Durable);
}

#[tokio::test]
async fn test_diagnostics_never_changes_mode() {
    let app = spawn_app(ConnectionState::Disconnected);

    for _ in 0..5 {
        let (status, diag) = app.admin_get("/admin/diagnostics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(diag["storageMode"], "database");
        assert_eq!(diag["connectionLabel"], "disconnected");
    }
    assert_eq!(app.state.mode.current(), StorageMode::Durable);

    let (status, _) = app.get("/admin/diagnostics").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_then_get_has_same_shape_in_both_modes() {
    let durable_app = spawn_app(ConnectionState::Connected);
    let degraded_app = spawn_app(ConnectionState::Disconnected);

    let mut shapes = Vec::new();
    for app in [&durable_app, &degraded_app] {
        let (status, created) = app.admin_post("/api/admin/posts", post_body("Parity")).await;
        assert_eq!(status, StatusCode::CREATED);

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = app.admin_get(&format!("/api/admin/posts/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let mut keys: Vec<String> = fetched.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        shapes.push(keys);
    }

    assert_eq!(durable_app.state.mode.current(), StorageMode::Durable);
    assert_eq!(degraded_app.state.mode.current(), StorageMode::Degraded);
    assert_eq!(shapes[0], shapes[1]);
}

#[tokio::test]
async fn test_no_visibility_across_modes() {
    let app = spawn_app(ConnectionState::Connected);

    let (_, durable_post) = app.admin_post("/api/admin/posts", post_body("Before Outage")).await;

    app.monitor.set(ConnectionState::Disconnected);
    let (status, degraded_post) = app.admin_post("/api/admin/posts", post_body("During Outage")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.state.mode.current(), StorageMode::Degraded);

    // The degraded backend only knows about the post written during the outage.
    let (_, page) = app.get("/api/posts").await;
    let slugs: Vec<&str> = page["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["during-outage"]);

    let durable_id = durable_post["id"].as_str().unwrap().parse().unwrap();
    let degraded_id = degraded_post["id"].as_str().unwrap().parse().unwrap();
    assert!(app.durable.get_post(degraded_id).await.unwrap().is_none());
    assert!(app.memory.get_post(durable_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_bound_storage_is_stable_within_a_request() {
    let app = spawn_app(ConnectionState::Connected);
    let bound = app.state.storage.bind(app.state.mode.current());

    let first = bound
        .create_post(serde_json::from_value(post_body("First Half")).unwrap())
        .await
        .unwrap();

    // A concurrent request degrades the process mid-flight.
    app.monitor.set(ConnectionState::Disconnected);
    let (status, _) = app.get("/api/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.state.mode.current(), StorageMode::Degraded);

    assert_eq!(bound.mode(), StorageMode::Durable);
    let read_back = bound.get_post(first.id).await.unwrap();
    assert_eq!(read_back.map(|p| p.id), Some(first.id));
}

#[tokio::test]
async fn test_public_listing_hides_drafts_and_paginates() {
    let app = spawn_app(ConnectionState::Connected);

    for i in 0..3 {
        app.admin_post("/api/admin/posts", post_body(&format!("Published {}", i))).await;
    }
    let mut draft = post_body("Secret Draft");
    draft["status"] = json!("draft");
    let (_, draft) = app.admin_post("/api/admin/posts", draft).await;

    let (status, page) = app.get("/api/posts?limit=2&offset=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["posts"].as_array().unwrap().len(), 2);
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 2);

    let (status, _) = app.get("/api/posts/secret-draft").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, found) = app.get("/api/posts?search=published%201").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["total"], 1);

    let (status, all) = app.admin_get("/api/admin/posts?status=draft").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["posts"][0]["id"], draft["id"]);

    let (status, stats) = app.admin_get("/api/admin/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["posts"], 4);
    assert_eq!(stats["published"], 3);
    assert_eq!(stats["drafts"], 1);
}

#[tokio::test]
async fn test_admin_routes_require_credentials() {
    let app = spawn_app(ConnectionState::Connected);

    let (status, _) = app
        .request(Method::POST, "/api/admin/posts", None, Some(post_body("Nope")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/admin/subscribers", Some("not-the-key"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/admin/subscribers", Some(API_KEY), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_and_delete_post() {
    let app = spawn_app(ConnectionState::Connected);
    let (_, created) = app.admin_post("/api/admin/posts", post_body("Editable")).await;
    let uri = format!("/api/admin/posts/{}", created["id"].as_str().unwrap());

    let (status, updated) = app
        .request(Method::PUT, &uri, Some(API_KEY), Some(json!({ "title": "Edited" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Edited");
    assert_eq!(updated["slug"], "editable");

    let (status, _) = app.request(Method::DELETE, &uri, Some(API_KEY), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.request(Method::DELETE, &uri, Some(API_KEY), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_offset_past_any_backend_is_an_empty_page() {
    let app = spawn_app(ConnectionState::Connected);
    app.admin_post("/api/admin/posts", post_body("Only Post")).await;

    let (status, page) = app.get("/api/posts?offset=18446744073709551615").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page["posts"].as_array().unwrap().is_empty());
    assert_eq!(page["total"], 1);
    assert_eq!(page["offset"], i64::MAX);
}

#[tokio::test]
async fn test_update_rejects_empty_slug() {
    let app = spawn_app(ConnectionState::Connected);
    let (_, created) = app.admin_post("/api/admin/posts", post_body("Keeps Slug")).await;
    let uri = format!("/api/admin/posts/{}", created["id"].as_str().unwrap());

    let (status, _) = app
        .request(Method::PUT, &uri, Some(API_KEY), Some(json!({ "slug": "!!!" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, fetched) = app.admin_get(&uri).await;
    assert_eq!(fetched["slug"], "keeps-slug");
}

#[tokio::test]
async fn test_subscribe_flow() {
    let app = spawn_app(ConnectionState::Disconnected);

    let (status, sub) = app
        .request(
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({ "email": "Reader@Example.com", "name": "Reader" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sub["email"], "reader@example.com");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/subscribe",
            None,
            Some(json!({ "email": "reader@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already subscribed");

    let (status, _) = app
        .request(Method::POST, "/api/subscribe", None, Some(json!({ "email": "nope" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = app.admin_get("/api/admin/subscribers").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(app.memory.list_subscribers().await.unwrap().len(), 1);
    assert!(app.durable.list_subscribers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = spawn_app(ConnectionState::Connected);
    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        axum::http::Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
