//! # Authentication and Authorization
//!
//! Bearer session tokens are verified by [`auth_middleware`], which loads the
//! account behind the token and stores it in the request as [`CurrentUser`].
//! Role checks run afterwards, either as a nested route layer
//! ([`require_admin`]) or inside handlers ([`require_any_role`]).

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use sea_orm::ConnectionTrait;
use thiserror::Error;

use crate::config::AppConfig;
use crate::error::{ApiError, RepositoryError, unauthorized};
use crate::models::Role;
use crate::models::user::Model as UserModel;
use crate::repositories::UserRepository;
use crate::server::AppState;
use crate::token::{TokenError, TokenService};

/// The authenticated account for the running request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserModel);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing or malformed Authorization header")]
    MissingToken,
    #[error("Session token is malformed")]
    Malformed,
    #[error("Session token has expired")]
    Expired,
    #[error("Session token signature is invalid")]
    InvalidSignature,
    #[error("Account not found")]
    UnknownSubject,
    #[error("Account is disabled")]
    AccountDisabled,
    #[error("Requires role {required}")]
    Forbidden { required: String },
    #[error(transparent)]
    Lookup(#[from] RepositoryError),
}

impl AuthError {
    /// Stable machine-readable reason, reported in error details and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::Malformed => "malformed_token",
            AuthError::Expired => "expired_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::UnknownSubject => "unknown_subject",
            AuthError::AccountDisabled => "account_disabled",
            AuthError::Forbidden { .. } => "forbidden",
            AuthError::Lookup(_) => "lookup_failed",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Expired => AuthError::Expired,
            TokenError::InvalidSignature => AuthError::InvalidSignature,
            TokenError::Malformed | TokenError::Signing(_) => AuthError::Malformed,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let reason = error.reason();
        match error {
            AuthError::Lookup(err) => err.into(),
            AuthError::Forbidden { .. } => {
                ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", error.to_string())
                    .with_details(serde_json::json!({ "reason": reason }))
            }
            _ => unauthorized(Some(&error.to_string()))
                .with_details(serde_json::json!({ "reason": reason })),
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.tokens)
    }
}

/// Returns the token from `Authorization: Bearer <token>`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Resolves the caller. Disabled accounts are refused even with a valid token.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    tokens: &TokenService,
    headers: &HeaderMap,
) -> Result<UserModel, AuthError> {
    let token = extract_bearer_token(headers)?;
    let subject = tokens.verify(token)?;

    let user = UserRepository::new(db)
        .find_by_id(subject.user_id)
        .await?
        .ok_or(AuthError::UnknownSubject)?;

    if !user.is_active() {
        return Err(AuthError::AccountDisabled);
    }
    Ok(user)
}

/// Authenticates the request and stores [`CurrentUser`] in its extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match authenticate(&state.db, &state.tokens, request.headers()).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.id, role = %user.role, "Authenticated request");
            request.extensions_mut().insert(CurrentUser(user));
            Ok(next.run(request).await)
        }
        Err(err) => {
            counter!("auth_rejections_total", "reason" => err.reason()).increment(1);
            if !matches!(err, AuthError::MissingToken) {
                tracing::info!(reason = err.reason(), path = %request.uri().path(), "Rejected session token");
            }
            Err(err.into())
        }
    }
}

pub fn require_role(user: &UserModel, required: Role) -> Result<(), AuthError> {
    require_any_role(user, &[required])
}

pub fn require_any_role(user: &UserModel, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&user.role) {
        return Ok(());
    }
    let required = allowed
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(" or ");
    tracing::warn!(user_id = %user.id, role = %user.role, required = %required, "Forbidden");
    counter!("auth_rejections_total", "reason" => "forbidden").increment(1);
    Err(AuthError::Forbidden { required })
}

/// Route layer for admin-only routers. Must sit inside [`auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| unauthorized(None))?;
    require_role(&user.0, Role::Admin)?;
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: Role) -> UserModel {
        UserModel {
            id: Uuid::new_v4(),
            last_name: "Martin".into(),
            first_name: "Claire".into(),
            email: "claire@example.fr".into(),
            phone: None,
            password_hash: String::new(),
            role,
            status: UserStatus::Active,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn missing_or_wrong_scheme_is_missing_token() {
        assert!(matches!(
            extract_bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            extract_bearer_token(&headers("Basic dXNlcjpwdw==")),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            extract_bearer_token(&headers("Bearer    ")),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn role_checks() {
        assert!(require_role(&user(Role::Admin), Role::Admin).is_ok());
        assert!(matches!(
            require_role(&user(Role::Tenant), Role::Admin),
            Err(AuthError::Forbidden { .. })
        ));
        assert!(require_any_role(&user(Role::Agent), &[Role::Agent, Role::Admin]).is_ok());
    }

    #[test]
    fn token_errors_map_to_401_with_reason() {
        let api: ApiError = AuthError::from(TokenError::Expired).into();
        assert_eq!(api.status, StatusCode::UNAUTHORIZED);
        assert_eq!(api.details.unwrap()["reason"], "expired_token");
    }

    #[test]
    fn forbidden_maps_to_403() {
        let api: ApiError = AuthError::Forbidden {
            required: "admin".into(),
        }
        .into();
        assert_eq!(api.status, StatusCode::FORBIDDEN);
        assert_eq!(&*api.code, "FORBIDDEN");
    }
}
