//! # Authentication API Handlers
//!
//! Registration, login and the current-identity endpoint.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::types::UserDto;
use crate::models::Role;
use crate::models::user::Model as UserModel;
use crate::password::SecretHasher;
use crate::repositories::{NewUser, UserRepository};
use crate::server::AppState;
use crate::validation::FieldErrors;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Claire")]
    pub first_name: String,
    #[schema(example = "Martin")]
    pub last_name: String,
    #[schema(example = "claire.martin@example.fr")]
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    /// Defaults to `tenant`. `admin` cannot be self-assigned.
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "claire.martin@example.fr")]
    pub email: String,
    pub password: String,
}

/// Session token plus the account it was issued for
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserDto,
}

/// Hashes on the blocking pool.
pub(crate) async fn hash_password(
    hasher: Arc<dyn SecretHasher>,
    password: String,
) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(|e| anyhow::Error::from(e).into())
}

async fn verify_password(
    hasher: Arc<dyn SecretHasher>,
    password: String,
    hash: String,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(|e| anyhow::Error::from(e).into())
}

fn issue_session(state: &AppState, user: UserModel) -> Result<AuthResponse, ApiError> {
    let issued = state
        .tokens
        .issue(user.id, user.role)
        .map_err(anyhow::Error::from)?;
    Ok(AuthResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
        user: user.into(),
    })
}

/// Well-formed Argon2id hash that no password matches.
pub(crate) const UNKNOWN_ACCOUNT_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$kEKtGp97wN6vunrH6+VcbA$ag9cGs4LAgs+qpEzxRxz633TlLctx5w7VBdRdEe7gxs";

fn invalid_credentials() -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        "INVALID_CREDENTIALS",
        "Invalid email or password",
    )
}

/// Checks email and password. Failures are indistinguishable to the caller
/// except for disabled accounts.
async fn check_credentials(state: &AppState, request: LoginRequest) -> Result<UserModel, ApiError> {
    let user = UserRepository::new(&state.db)
        .find_by_email(&request.email)
        .await?;

    let Some(user) = user else {
        // Match the hashing cost of a known account.
        let _ = verify_password(
            Arc::clone(&state.hasher),
            request.password,
            UNKNOWN_ACCOUNT_HASH.to_string(),
        )
        .await;
        counter!("auth_login_total", "outcome" => "unknown_email").increment(1);
        return Err(invalid_credentials());
    };

    if !verify_password(
        Arc::clone(&state.hasher),
        request.password,
        user.password_hash.clone(),
    )
    .await?
    {
        counter!("auth_login_total", "outcome" => "bad_password").increment(1);
        tracing::info!(user_id = %user.id, "Login rejected: bad password");
        return Err(invalid_credentials());
    }

    if !user.is_active() {
        counter!("auth_login_total", "outcome" => "disabled").increment(1);
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "ACCOUNT_DISABLED",
            "Account is disabled",
        ));
    }

    Ok(user)
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation failed or email already registered", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let mut errors = FieldErrors::new();
    errors.required("first_name", &request.first_name);
    errors.required("last_name", &request.last_name);
    errors.email("email", &request.email);
    errors.password("password", &request.password, state.config.min_password_length);
    if request.role == Some(Role::Admin) {
        errors.add("role", "admin accounts cannot be self-registered");
    }
    errors.into_result()?;

    let password_hash = hash_password(Arc::clone(&state.hasher), request.password).await?;
    let user = UserRepository::new(&state.db)
        .create(NewUser {
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone: request.phone,
            password_hash,
            role: request.role.unwrap_or(Role::Tenant),
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Account registered");

    Ok((StatusCode::CREATED, Json(issue_session(&state, user)?)))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Invalid credentials or disabled account", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = check_credentials(&state, request).await?;

    counter!("auth_login_total", "outcome" => "success").increment(1);
    tracing::info!(user_id = %user.id, role = %user.role, "Login succeeded");

    Ok(Json(issue_session(&state, user)?))
}

/// Log in to the back office; only admins are accepted
#[utoipa::path(
    post,
    path = "/api/v1/auth/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Invalid credentials or disabled account", body = ApiError),
        (status = 403, description = "Account is not an admin", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = check_credentials(&state, request).await?;

    if user.role != Role::Admin {
        counter!("auth_login_total", "outcome" => "not_admin").increment(1);
        tracing::warn!(user_id = %user.id, role = %user.role, "Admin login refused");
        return Err(crate::error::forbidden(Some("Admin access required")));
    }

    counter!("auth_login_total", "outcome" => "success").increment(1);
    tracing::info!(user_id = %user.id, "Admin login succeeded");

    Ok(Json(issue_session(&state, user)?))
}

/// The authenticated account
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current account", body = UserDto),
        (status = 401, description = "Missing or invalid session token", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserDto> {
    Json(user.into())
}
