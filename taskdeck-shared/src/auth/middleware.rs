//! Identity resolution for incoming requests
//!
//! A request is authenticated by an access token taken from, in order:
//!
//! 1. the `Authorization: Bearer <token>` header
//! 2. the `auth-token` cookie set by login, when no Authorization header
//!    is present
//!
//! The token must validate and its subject must still exist in the store.
//! Every failure is an [`AuthError`], which renders as 401 (or 500 when the
//! store itself is down). There is no anonymous fallback.
//!
//! # Example
//!
//! ```no_run
//! use axum::{middleware, routing::get, Router};
//! use std::sync::Arc;
//! use taskdeck_shared::auth::middleware::{require_auth, AuthContext, IdentityResolver};
//! use taskdeck_shared::store::memory::MemoryStore;
//!
//! async fn whoami(auth: AuthContext) -> String {
//!     auth.user_id.to_string()
//! }
//!
//! let resolver = IdentityResolver::new(
//!     Arc::new(MemoryStore::new()),
//!     "test-secret-key-at-least-32-bytes-long",
//! );
//!
//! let app: Router = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(middleware::from_fn_with_state(resolver, require_auth));
//! ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::store::{Store, StoreError};

/// Name of the session cookie written by login
pub const AUTH_COOKIE: &str = "auth-token";

/// Authenticated caller, inserted into request extensions by [`require_auth`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
}

/// Authentication failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token is valid but names a user that no longer exists
    #[error("Unknown user")]
    UnknownUser,

    #[error("Identity lookup failed: {0}")]
    Store(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AuthError::Store(msg) => {
                error!(error = %msg, "Identity lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            other => (StatusCode::UNAUTHORIZED, "unauthorized", other.to_string()),
        };

        (status, Json(AuthErrorBody { error, message })).into_response()
    }
}

/// Pulls the raw token out of the headers
///
/// A present but non-Bearer Authorization header is an error; the cookie is
/// only consulted when the header is absent.
pub fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidToken("Malformed Authorization header".to_string()))?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))?;
        return Ok(token.to_string());
    }

    cookie_value(headers, AUTH_COOKIE).ok_or(AuthError::MissingCredentials)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolves requests to user ids
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn Store>,
    secret: Arc<str>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn Store>, secret: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            secret: secret.into(),
        }
    }

    /// Returns the id of the user the request is authenticated as
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Uuid, AuthError> {
        let token = extract_token(headers)?;
        let claims = validate_access_token(&token, &self.secret)?;

        match self.store.find_user_by_id(claims.sub).await? {
            Some(user) => Ok(user.id),
            None => {
                debug!(user_id = %claims.sub, "Token names a deleted user");
                Err(AuthError::UnknownUser)
            }
        }
    }
}

/// Middleware rejecting unauthenticated requests
///
/// On success the [`AuthContext`] is available to handlers as an extractor.
pub async fn require_auth(
    State(resolver): State<IdentityResolver>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user_id = resolver.resolve(req.headers()).await?;
    req.extensions_mut().insert(AuthContext { user_id });

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use crate::models::user::CreateUser;
    use crate::store::memory::MemoryStore;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    async fn resolver_with_user() -> (IdentityResolver, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(CreateUser {
                email: "a@example.com".to_string(),
                name: "A".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (IdentityResolver::new(store.clone(), SECRET), store, user.id)
    }

    fn access_token(user_id: Uuid) -> String {
        create_token(&Claims::new(user_id, TokenType::Access), SECRET).unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer abc.def.ghi")]);
        assert_eq!(extract_token(&h).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_extract_cookie_token() {
        let h = headers(&[(header::COOKIE, "theme=dark; auth-token=abc.def; other=1")]);
        assert_eq!(extract_token(&h).unwrap(), "abc.def");
    }

    #[test]
    fn test_header_takes_precedence_over_cookie() {
        let h = headers(&[
            (header::AUTHORIZATION, "Basic dXNlcjpwYXNz"),
            (header::COOKIE, "auth-token=abc.def"),
        ]);
        assert!(matches!(extract_token(&h), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_missing_credentials() {
        assert!(matches!(
            extract_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        let empty_cookie = headers(&[(header::COOKIE, "auth-token=")]);
        assert!(matches!(
            extract_token(&empty_cookie),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_resolve_valid_token() {
        let (resolver, _, user_id) = resolver_with_user().await;

        let bearer = format!("Bearer {}", access_token(user_id));
        let h = headers(&[(header::AUTHORIZATION, bearer.as_str())]);
        assert_eq!(resolver.resolve(&h).await.unwrap(), user_id);

        let cookie = format!("{}={}", AUTH_COOKIE, access_token(user_id));
        let h = headers(&[(header::COOKIE, cookie.as_str())]);
        assert_eq!(resolver.resolve(&h).await.unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_resolve_rejects_bad_tokens() {
        let (resolver, _, user_id) = resolver_with_user().await;

        let refresh = create_token(&Claims::new(user_id, TokenType::Refresh), SECRET).unwrap();
        let expired = create_token(
            &Claims::with_expiration(user_id, TokenType::Access, Duration::seconds(-60)),
            SECRET,
        )
        .unwrap();
        let unknown = access_token(Uuid::new_v4());

        for token in [refresh, expired, "garbage".to_string()] {
            let bearer = format!("Bearer {}", token);
            let h = headers(&[(header::AUTHORIZATION, bearer.as_str())]);
            assert!(matches!(
                resolver.resolve(&h).await,
                Err(AuthError::InvalidToken(_))
            ));
        }

        let bearer = format!("Bearer {}", unknown);
        let h = headers(&[(header::AUTHORIZATION, bearer.as_str())]);
        assert!(matches!(resolver.resolve(&h).await, Err(AuthError::UnknownUser)));
    }

    #[tokio::test]
    async fn test_store_outage_is_not_unauthenticated() {
        let (resolver, store, user_id) = resolver_with_user().await;
        store.set_available(false);

        let bearer = format!("Bearer {}", access_token(user_id));
        let h = headers(&[(header::AUTHORIZATION, bearer.as_str())]);
        let err = resolver.resolve(&h).await.unwrap_err();

        assert!(matches!(err, AuthError::Store(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_error_status() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::UnknownUser.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
