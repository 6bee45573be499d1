//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` is the user id. The middleware turns a
//! valid `Authorization: Bearer ...` header into an [`AuthUser`] request
//! extension; handlers that need the actor take `Extension<AuthUser>`.
//! The user row is re-read on every request, so deleted users lose access
//! and the admin flag always reflects the stored account.

pub mod password;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::AppState;

pub use password::{hash_password, verify_password};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller, as attached to the request by [`auth_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i32,
    pub is_admin: bool,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Administrator privileges required".to_string(),
            ))
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token")]
    InvalidToken,
    #[error("User no longer exists")]
    UnknownUser,
    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiration: Duration,
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            token_expiration: Duration::from_secs(cfg.jwt_expiration_secs),
        }
    }
}

/// Issues and validates bearer tokens
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("token_expiration", &self.config.token_expiration)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generate a JWT token for a user
    pub fn issue_token(&self, user: &user::Model) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(self.config.token_expiration.as_secs())
            .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;
        let claims = Claims {
            sub: user.id.to_string(),
            is_admin: user.is_admin,
            iat: now,
            exp: now + lifetime,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }

    /// Resolves the caller from request headers.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.validate_token(token)?;
        let id = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthUser {
            id,
            is_admin: claims.is_admin,
        })
    }
}

/// Rejects requests without a valid bearer token or whose user no longer
/// exists, otherwise attaches [`AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let claimed = match state.auth.authenticate(request.headers()) {
        Ok(user) => user,
        Err(e) => return ServiceError::from(e).into_response(),
    };

    match state.services.users.resolve_actor(claimed.id).await {
        Ok(Some(user)) => {
            debug!(user_id = user.id, "authenticated request");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => {
            warn!(user_id = claimed.id, "token for a user that no longer exists");
            ServiceError::from(AuthError::UnknownUser).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service(expiration: Duration) -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "test_secret_that_is_long_enough_for_hs256".into(),
            token_expiration: expiration,
        })
    }

    fn user(id: i32, is_admin: bool) -> user::Model {
        user::Model {
            id,
            fullname: "Maria Souza".into(),
            username: "maria".into(),
            email: "maria@example.com".into(),
            password: String::new(),
            is_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn issued_tokens_authenticate_the_same_user() {
        let auth = service(Duration::from_secs(3600));
        let token = auth.issue_token(&user(42, true)).unwrap();

        assert_eq!(
            auth.authenticate(&bearer(&token)).unwrap(),
            AuthUser {
                id: 42,
                is_admin: true
            }
        );
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let other = AuthService::new(AuthConfig {
            jwt_secret: "a_completely_different_signing_secret".into(),
            token_expiration: Duration::from_secs(3600),
        });
        let token = other.issue_token(&user(1, false)).unwrap();

        assert_eq!(
            service(Duration::from_secs(3600)).authenticate(&bearer(&token)),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        let auth = service(Duration::from_secs(3600));
        assert_eq!(
            auth.authenticate(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(auth.authenticate(&headers), Err(AuthError::MissingToken));
    }

    #[test]
    fn non_admins_are_forbidden_from_admin_operations() {
        let err = AuthUser {
            id: 3,
            is_admin: false,
        }
        .require_admin()
        .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
