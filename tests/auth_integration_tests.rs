//! Integration tests for authentication against a live listener.

use anyhow::{Context, Result as AnyhowResult};
use chrono::{Duration, Utc};
use realty::{
    config::AppConfig,
    models::Role,
    server::{AppState, create_app},
    token::TokenService,
};
use reqwest::StatusCode;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

#[path = "test_utils/mod.rs"]
mod test_utils;

struct TestServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<AnyhowResult<()>>>,
}

impl TestServerHandle {
    fn new(shutdown_tx: oneshot::Sender<()>, join_handle: JoinHandle<AnyhowResult<()>>) -> Self {
        Self {
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
        }
    }

    async fn shutdown(mut self) -> AnyhowResult<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.join_handle.take() {
            let result = handle.await.context("server task join failed")?;
            result?;
        }

        Ok(())
    }
}

impl Drop for TestServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Test helper to spawn a test server
async fn spawn_test_app(config: AppConfig) -> (String, DatabaseConnection, TestServerHandle) {
    let db = test_utils::setup_test_db().await.unwrap();
    let app = create_app(AppState::new(config, db.clone()));

    // Bind to a random port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_url = format!("http://{}", addr);

    let (ready_tx, ready_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let _ = ready_tx.send(());

        server.await.context("axum server error")
    });

    ready_rx.await.expect("server task to signal readiness");

    (server_url, db, TestServerHandle::new(shutdown_tx, server_task))
}

async fn reason(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["details"]["reason"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_public_endpoints_no_auth_required() {
    let (server_url, _db, handle) = spawn_test_app(test_utils::test_config()).await;
    let client = reqwest::Client::new();

    for path in [
        "/",
        "/healthz",
        "/readyz",
        "/docs/",
        "/openapi.json",
        "/api/v1/properties",
        "/api/v1/properties/available",
        "/api/v1/property-types",
        "/api/v1/characteristics",
        "/api/v1/characteristics/categories",
    ] {
        let response = client
            .get(format!("{}{}", server_url, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_responses_carry_trace_id() {
    let (server_url, _db, handle) = spawn_test_app(test_utils::test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/auth/me", server_url))
        .header("X-Trace-Id", "trace-abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-trace-id"], "trace-abc-123");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["trace_id"], "trace-abc-123");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_expired_and_foreign_tokens_are_rejected() {
    let config = test_utils::test_config();
    let (server_url, db, handle) = spawn_test_app(config.clone()).await;
    let client = reqwest::Client::new();
    let owner = test_utils::create_user(&db, Role::Owner).await.unwrap();
    let tokens = TokenService::from_config(&config);

    let expired = tokens
        .issue_at(owner.id, owner.role, Utc::now() - Duration::days(2))
        .unwrap();
    let response = client
        .get(format!("{}/api/v1/auth/me", server_url))
        .bearer_auth(&expired.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(reason(response).await, "expired_token");

    let foreign = TokenService::new(
        b"some-other-deployment-secret-value!!",
        Duration::hours(1),
    )
    .issue(owner.id, owner.role)
    .unwrap();
    let response = client
        .get(format!("{}/api/v1/auth/me", server_url))
        .bearer_auth(&foreign.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(reason(response).await, "invalid_signature");

    let valid = tokens.issue(owner.id, owner.role).unwrap();
    let response = client
        .get(format!("{}/api/v1/auth/me", server_url))
        .bearer_auth(&valid.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_token_for_deleted_subject_is_rejected() {
    let config = test_utils::test_config();
    let (server_url, _db, handle) = spawn_test_app(config.clone()).await;

    let token = TokenService::from_config(&config)
        .issue(uuid::Uuid::new_v4(), Role::Admin)
        .unwrap();
    let response = reqwest::Client::new()
        .get(format!("{}/api/v1/agents", server_url))
        .bearer_auth(&token.token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(reason(response).await, "unknown_subject");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_admin_login_only_accepts_admins() {
    let (server_url, db, handle) = spawn_test_app(test_utils::test_config()).await;
    let client = reqwest::Client::new();
    let agent = test_utils::create_user(&db, Role::Agent).await.unwrap();
    let admin = test_utils::create_user(&db, Role::Admin).await.unwrap();

    let response = client
        .post(format!("{}/api/v1/auth/admin/login", server_url))
        .json(&json!({ "email": agent.email, "password": test_utils::TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .post(format!("{}/api/v1/auth/admin/login", server_url))
        .json(&json!({ "email": admin.email, "password": test_utils::TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["token_type"], "Bearer");

    let response = client
        .get(format!("{}/api/v1/agents", server_url))
        .bearer_auth(body["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    handle.shutdown().await.unwrap();
}
