//! Account endpoints
//!
//! - `POST /v1/auth/register`: create an account, returns tokens
//! - `POST /v1/auth/login`: verify credentials, returns tokens
//! - `POST /v1/auth/refresh`: exchange a refresh token for a new access token
//! - `POST /v1/auth/logout`: clear the session cookie
//! - `GET  /v1/auth/me`: profile of the authenticated user
//!
//! Register, login and refresh also set the `auth-token` cookie so browser
//! clients can authenticate without handling tokens themselves.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    access::field_errors,
    auth::{
        jwt::{self, Claims, TokenType},
        middleware::{AuthContext, AUTH_COOKIE},
        password,
    },
    models::user::{normalize_email, CreateUser, User},
};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Tokens issued by register and login
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,

    pub access_token: String,

    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,

    pub expires_in: i64,
}

/// `Set-Cookie` value carrying an access token
fn session_cookie(token: &str, secure: bool) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        AUTH_COOKIE,
        token,
        TokenType::Access.default_expiration().num_seconds(),
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value expiring the session cookie
fn cleared_cookie(secure: bool) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
        AUTH_COOKIE,
        if secure { "; Secure" } else { "" }
    )
}

fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let access_token = jwt::create_token(&Claims::new(user.id, TokenType::Access), state.jwt_secret())?;
    let refresh_token =
        jwt::create_token(&Claims::new(user.id, TokenType::Refresh), state.jwt_secret())?;

    Ok(AuthResponse {
        user,
        access_token,
        refresh_token,
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    })
}

/// Creates an account
///
/// Returns 201 with tokens, 400 on invalid input and 409 if the email is
/// already registered.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(field_errors(&e)))?;

    password::validate_password_strength(&req.password)
        .map_err(|message| ApiError::invalid_field("password", message))?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid_field("name", "Name is required"));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = state
        .store
        .create_user(CreateUser {
            email: normalize_email(&req.email),
            name: name.to_string(),
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    let body = issue_tokens(&state, user)?;
    let cookie = session_cookie(&body.access_token, state.config.api.production);

    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(body)))
}

/// Verifies credentials and starts a session
///
/// Unknown emails and wrong passwords get the same 401.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(field_errors(&e)))?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let Some(user) = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
    else {
        warn!("Login attempt for unknown email");
        return Err(invalid());
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "Login attempt with wrong password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "User logged in");

    let body = issue_tokens(&state, user)?;
    let cookie = session_cookie(&body.access_token, state.config.api.production);

    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// Issues a new access token for a valid refresh token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    if state.store.find_user_by_id(claims.sub).await?.is_none() {
        return Err(ApiError::Unauthorized("Unknown user".to_string()));
    }

    let access_token =
        jwt::create_token(&Claims::new(claims.sub, TokenType::Access), state.jwt_secret())?;
    let cookie = session_cookie(&access_token, state.config.api.production);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(RefreshResponse {
            access_token,
            expires_in: TokenType::Access.default_expiration().num_seconds(),
        }),
    ))
}

/// Clears the session cookie
///
/// Tokens are stateless, so an already-issued bearer token stays valid
/// until it expires.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cleared_cookie(state.config.api.production))],
    )
}

/// Returns the authenticated user's profile
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<User>> {
    let user = state
        .store
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    Ok(Json(user))
}
