use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::json;

use userdir_core::User;
use userdir_infra::{InMemoryUserStore, NewUser, StoreError, UserPatch, UserStore};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Build the prod router around the given store and bind it to an
    /// ephemeral port.
    async fn spawn_with(store: Arc<dyn UserStore>) -> Self {
        let app = userdir_api::app::build_app(store);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    async fn spawn() -> Self {
        Self::spawn_with(Arc::new(InMemoryUserStore::new())).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A store whose every operation fails, for exercising the 5xx paths.
struct BrokenStore;

#[async_trait]
impl UserStore for BrokenStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Err(StoreError::Database("connection refused".to_string()))
    }

    async fn insert(&self, _new_user: NewUser) -> Result<User, StoreError> {
        Err(StoreError::Database("connection refused".to_string()))
    }

    async fn find(&self, _id: i64) -> Result<Option<User>, StoreError> {
        Err(StoreError::Database("connection refused".to_string()))
    }

    async fn update(&self, _id: i64, _patch: UserPatch) -> Result<Option<User>, StoreError> {
        Err(StoreError::Database("connection refused".to_string()))
    }

    async fn delete(&self, _id: i64) -> Result<bool, StoreError> {
        Err(StoreError::Database("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Database("connection refused".to_string()))
    }
}

#[tokio::test]
async fn user_lifecycle_create_fetch_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Create
    let res = client
        .post(srv.url("/api/v1/users"))
        .json(&json!({ "username": "bob", "email": "bob@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "bob");
    assert_eq!(body["data"]["email"], "bob@x.com");
    let id = body["data"]["id"].as_i64().unwrap();

    let created_at: DateTime<Utc> = body["data"]["created_at"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    let updated_at: DateTime<Utc> = body["data"]["updated_at"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(created_at <= updated_at);

    // Fetch
    let res = client
        .get(srv.url(&format!("/api/v1/users/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["username"], "bob");
    assert_eq!(body["data"]["email"], "bob@x.com");

    // Delete
    let res = client
        .delete(srv.url(&format!("/api/v1/users/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["message"], "User deleted successfully");

    // Gone
    let res = client
        .get(srv.url(&format!("/api/v1/users/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_returns_users_in_id_order() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for (username, email) in [("carol", "c@x.com"), ("alice", "a@x.com")] {
        let res = client
            .post(srv.url("/api/v1/users"))
            .json(&json!({ "username": username, "email": email }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client.get(srv.url("/api/v1/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users[0]["id"].as_i64().unwrap() < users[1]["id"].as_i64().unwrap());
    assert_eq!(users[0]["username"], "carol");
}

#[tokio::test]
async fn create_rejects_invalid_bodies() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Not JSON at all.
    let res = client
        .post(srv.url("/api/v1/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid request body");

    // Missing username.
    let res = client
        .post(srv.url("/api/v1/users"))
        .json(&json!({ "username": "", "email": "a@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "username is required");

    // Missing email.
    let res = client
        .post(srv.url("/api/v1/users"))
        .json(&json!({ "username": "alice", "email": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "email is required");
}

#[tokio::test]
async fn create_duplicate_username_conflicts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/v1/users"))
        .json(&json!({ "username": "alice", "email": "a@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // Same username, different email.
    let res = client
        .post(srv.url("/api/v1/users"))
        .json(&json!({ "username": "alice", "email": "other@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "User with this username or email already exists");

    // Same email, different username.
    let res = client
        .post(srv.url("/api/v1/users"))
        .json(&json!({ "username": "bob", "email": "a@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_touches_only_provided_fields() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/v1/users"))
        .json(&json!({ "username": "alice", "email": "a@x.com" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let id = body["data"]["id"].as_i64().unwrap();

    let res = client
        .put(srv.url(&format!("/api/v1/users/{}", id)))
        .json(&json!({ "username": "alice2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["username"], "alice2");
    assert_eq!(body["data"]["email"], "a@x.com");

    let created_at: DateTime<Utc> = body["data"]["created_at"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    let updated_at: DateTime<Utc> = body["data"]["updated_at"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(created_at <= updated_at);
}

#[tokio::test]
async fn update_with_no_fields_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/v1/users"))
        .json(&json!({ "username": "alice", "email": "a@x.com" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let id = body["data"]["id"].as_i64().unwrap();

    let res = client
        .put(srv.url(&format!("/api/v1/users/{}", id)))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "at least one field must be provided");
}

#[tokio::test]
async fn missing_rows_yield_404() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/api/v1/users/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .put(srv.url("/api/v1/users/999"))
        .json(&json!({ "username": "ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url("/api/v1/users/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_id_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/api/v1/users/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Invalid user ID");
}

#[tokio::test]
async fn unsupported_methods_yield_405() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .patch(srv.url("/api/v1/users"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Method not allowed");

    let res = client
        .post(srv.url("/api/v1/users/1"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let res = client
        .post(srv.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unmatched_path_yields_404_envelope() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/v2/nope")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn health_reports_database_state() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["database"], "connected");
}

#[tokio::test]
async fn health_degrades_to_503_when_store_is_down() {
    let srv = TestServer::spawn_with(Arc::new(BrokenStore)).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Database connection failed");
}

#[tokio::test]
async fn store_failures_become_generic_500s() {
    let srv = TestServer::spawn_with(Arc::new(BrokenStore)).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/v1/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    // Internal detail must not leak.
    assert_eq!(body["error"], "Failed to fetch users");
}

#[tokio::test]
async fn preflight_is_answered_without_reaching_handlers() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .request(reqwest::Method::OPTIONS, srv.url("/api/v1/users"))
        .header("origin", "http://example.com")
        .header("access-control-request-method", "POST")
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());
    assert!(res.headers().contains_key("access-control-allow-methods"));
    // The CORS layer answers directly; no envelope body.
    let body = res.text().await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn responses_carry_allow_origin_header() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/health"))
        .header("origin", "http://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(
        res.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
