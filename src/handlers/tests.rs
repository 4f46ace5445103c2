//! # Tests for Handlers
//!
//! Handler functions called directly with a state backed by an in-memory
//! SQLite database.

use axum::{extract::State, http::StatusCode, response::Json};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ColumnTrait, ConnectOptions, Database, EntityTrait, PaginatorTrait, QueryFilter};

use crate::config::AppConfig;
use crate::handlers::auth::{
    LoginRequest, RegisterRequest, UNKNOWN_ACCOUNT_HASH, login, register,
};
use crate::handlers::properties::page_params;
use crate::handlers::{healthz, readyz, root};
use crate::models::{Role, User, user};
use crate::password::{Argon2Hasher, SecretHasher};
use crate::server::AppState;

async fn test_state() -> AppState {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    AppState::new(AppConfig::default(), db)
}

fn registration(email: &str, role: Option<Role>) -> RegisterRequest {
    RegisterRequest {
        first_name: "Claire".to_string(),
        last_name: "Martin".to_string(),
        email: email.to_string(),
        phone: None,
        password: "s3cure-password".to_string(),
        role,
    }
}

#[tokio::test]
async fn test_root_handler_returns_expected_service_info() {
    let Json(service_info) = root().await;

    assert_eq!(service_info.service, "realty-api");
    assert_eq!(service_info.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_healthz_reports_ok() {
    let Json(health) = healthz().await;
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn test_readyz_reports_ready_with_database() {
    let state = test_state().await;
    let Json(health) = readyz(State(state)).await.unwrap();
    assert_eq!(health.status, "ready");
}

#[tokio::test]
async fn test_register_defaults_to_tenant_and_issues_token() {
    let state = test_state().await;

    let (status, Json(response)) = register(
        State(state.clone()),
        Json(registration("Claire@Example.fr", None)),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response.token_type, "Bearer");
    assert_eq!(response.user.role, Role::Tenant);
    assert_eq!(response.user.email, "claire@example.fr");

    let subject = state.tokens.verify(&response.token).unwrap();
    assert_eq!(subject.user_id, response.user.id);
}

#[tokio::test]
async fn test_register_rejects_admin_role() {
    let state = test_state().await;

    let error = register(
        State(state),
        Json(registration("admin@example.fr", Some(Role::Admin))),
    )
    .await
    .unwrap_err();

    assert_eq!(error.status, StatusCode::BAD_REQUEST);
    assert_eq!(&*error.code, "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_register_duplicate_email_is_bad_request() {
    let state = test_state().await;
    register(
        State(state.clone()),
        Json(registration("dup@example.fr", None)),
    )
    .await
    .unwrap();

    let error = register(
        State(state.clone()),
        Json(registration("DUP@example.fr", None)),
    )
    .await
    .unwrap_err();

    assert_eq!(error.status, StatusCode::BAD_REQUEST);
    assert_eq!(&*error.code, "CONFLICT");

    let accounts = User::find()
        .filter(user::Column::Email.eq("dup@example.fr"))
        .count(&state.db)
        .await
        .unwrap();
    assert_eq!(accounts, 1);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_rejected() {
    let state = test_state().await;
    register(
        State(state.clone()),
        Json(registration("owner@example.fr", Some(Role::Owner))),
    )
    .await
    .unwrap();

    let error = login(
        State(state.clone()),
        Json(LoginRequest {
            email: "owner@example.fr".to_string(),
            password: "wrong-password".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(&*error.code, "INVALID_CREDENTIALS");

    let Json(response) = login(
        State(state),
        Json(LoginRequest {
            email: "owner@example.fr".to_string(),
            password: "s3cure-password".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(response.user.role, Role::Owner);
}

#[test]
fn test_page_params_defaults_and_bounds() {
    assert_eq!(page_params(None, None).unwrap(), (1, 10));
    assert_eq!(page_params(Some(3), Some(100)).unwrap(), (3, 100));
    assert!(page_params(Some(0), None).is_err());
    assert!(page_params(None, Some(0)).is_err());
    assert!(page_params(None, Some(101)).is_err());
}

#[tokio::test]
async fn test_login_with_unknown_email_is_rejected() {
    let state = test_state().await;

    let error = login(
        State(state),
        Json(LoginRequest {
            email: "nobody@example.fr".to_string(),
            password: "s3cure-password".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(error.status, StatusCode::BAD_REQUEST);
    assert_eq!(&*error.code, "INVALID_CREDENTIALS");
}

#[test]
fn test_unknown_account_hash_is_verifiable_and_matches_nothing() {
    let hasher = Argon2Hasher::new();
    assert!(!hasher.verify("s3cure-password", UNKNOWN_ACCOUNT_HASH).unwrap());
    assert!(!hasher.verify("", UNKNOWN_ACCOUNT_HASH).unwrap());
}
