/// Caller authentication for Axum
///
/// Token verification is hidden behind the [`Authenticator`] trait so the HTTP layer
/// only ever sees a user ID. The default implementation, [`JwtAuthenticator`], verifies
/// HS256 access tokens; tests and other deployments can plug in their own.
///
/// # Request Extensions
///
/// After successful authentication the API middleware adds an [`AuthContext`] to the
/// request extensions.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use mealplan_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Authentication context added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

/// Error type for caller authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Authorization header is not `Bearer <token>`
    #[error("Expected Bearer token")]
    InvalidFormat,

    /// Token validation failed
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InvalidFormat => StatusCode::BAD_REQUEST,
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        };
        (status, self.to_string()).into_response()
    }
}

/// Resolves a bearer token to the calling user
pub trait Authenticator: Send + Sync {
    fn resolve_caller(&self, token: &str) -> Result<Uuid, AuthError>;
}

/// HS256 JWT verifier
pub struct JwtAuthenticator {
    secret: String,
}

impl JwtAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Authenticator for JwtAuthenticator {
    fn resolve_caller(&self, token: &str) -> Result<Uuid, AuthError> {
        let claims = validate_access_token(token, &self.secret)?;
        Ok(claims.sub)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// Authenticates the request headers, producing the context handlers receive
pub fn authenticate(
    authenticator: &dyn Authenticator,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let user_id = authenticator.resolve_caller(token)?;
    Ok(AuthContext { user_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), "abc");
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers("Basic abc")),
            Err(AuthError::InvalidFormat)
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer ")),
            Err(AuthError::InvalidFormat)
        ));
    }

    #[test]
    fn test_jwt_authenticator_resolves_subject() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, TokenType::Access), SECRET).unwrap();
        let authenticator = JwtAuthenticator::new(SECRET);

        let ctx = authenticate(&authenticator, &headers(&format!("Bearer {}", token))).unwrap();
        assert_eq!(ctx.user_id, user_id);
    }

    #[test]
    fn test_jwt_authenticator_rejects_refresh_token() {
        let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Refresh), SECRET).unwrap();
        let authenticator = JwtAuthenticator::new(SECRET);

        assert!(matches!(
            authenticator.resolve_caller(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_auth_error_status() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidFormat.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
