//! Session token issuance and verification.
//!
//! Tokens are stateless HS256 JWTs carrying the subject id and role. They
//! cannot be revoked; they stop working when they expire or when the
//! signing secret is rotated.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::Role;

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: user id.
    pub sub: String,
    pub role: Role,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
}

/// What a valid token proves about its bearer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: Uuid,
    pub role: Role,
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and verifies session tokens with one injected secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let ttl_seconds = i64::try_from(config.token_ttl_seconds).unwrap_or(i64::MAX);
        Self::new(config.jwt_secret.as_bytes(), Duration::seconds(ttl_seconds))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, role, Utc::now())
    }

    /// Issues a token as if the clock read `issued_at`.
    pub fn issue_at(
        &self,
        user_id: Uuid,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<TokenSubject, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies signature first, then expiry against `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenSubject, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                _ => TokenError::Malformed,
            })?;

        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Malformed)?;

        Ok(TokenSubject {
            user_id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"unit-test-secret-with-enough-bytes", Duration::hours(24))
    }

    #[test]
    fn issue_then_verify() {
        let service = service();
        let user_id = Uuid::new_v4();

        let issued = service.issue(user_id, Role::Agent).unwrap();
        let subject = service.verify(&issued.token).unwrap();

        assert_eq!(subject.user_id, user_id);
        assert_eq!(subject.role, Role::Agent);
    }

    #[test]
    fn default_lifetime_is_one_day() {
        let service = TokenService::from_config(&AppConfig::default());
        let now = Utc::now();
        let issued = service.issue_at(Uuid::new_v4(), Role::Tenant, now).unwrap();

        assert_eq!(issued.expires_at.timestamp() - now.timestamp(), 86_400);
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = service();
        let issued_at = Utc::now() - Duration::hours(25);
        let issued = service
            .issue_at(Uuid::new_v4(), Role::Owner, issued_at)
            .unwrap();

        assert_eq!(service.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn token_valid_until_exact_expiry_second() {
        let service = service();
        let issued_at = Utc::now();
        let issued = service.issue_at(Uuid::new_v4(), Role::Owner, issued_at).unwrap();

        assert!(service.verify_at(&issued.token, issued.expires_at).is_ok());
        assert_eq!(
            service.verify_at(&issued.token, issued.expires_at + Duration::seconds(1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn other_secret_fails_signature() {
        let issued = service().issue(Uuid::new_v4(), Role::Admin).unwrap();
        let rotated = TokenService::new(b"a-completely-different-secret-value", Duration::hours(24));

        assert_eq!(
            rotated.verify(&issued.token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn signature_checked_before_expiry() {
        let issued = service()
            .issue_at(Uuid::new_v4(), Role::Admin, Utc::now() - Duration::days(3))
            .unwrap();
        let rotated = TokenService::new(b"a-completely-different-secret-value", Duration::hours(24));

        assert_eq!(
            rotated.verify(&issued.token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: Role::Admin,
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret-with-enough-bytes"),
        )
        .unwrap();

        assert_eq!(
            service().verify(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let service = service();
        for token in ["", "abc", "a.b.c", "not.a.token.at.all"] {
            assert_eq!(service.verify(token), Err(TokenError::Malformed), "{token}");
        }
    }

    #[test]
    fn non_uuid_subject_is_malformed() {
        let claims = Claims {
            sub: "user-42".to_string(),
            role: Role::Tenant,
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret-with-enough-bytes"),
        )
        .unwrap();

        assert_eq!(service().verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let service = service();
        let issued = service.issue(Uuid::new_v4(), Role::Tenant).unwrap();
        let admin = service.issue(Uuid::new_v4(), Role::Admin).unwrap();

        let mut parts: Vec<&str> = issued.token.split('.').collect();
        let admin_parts: Vec<&str> = admin.token.split('.').collect();
        parts[1] = admin_parts[1];
        let forged = parts.join(".");

        assert_eq!(service.verify(&forged), Err(TokenError::InvalidSignature));
    }
}
