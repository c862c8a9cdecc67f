//! Common test utilities for API tests
//!
//! Every context runs the full router over a fresh in-memory store, so tests
//! need no database and never see each other's data.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use taskdeck_api::app::{build_router, AppState};
use taskdeck_api::config::{ApiConfig, Config, JwtConfig, StorageBackend};
use taskdeck_shared::auth::jwt::{create_token, Claims, TokenType};
use taskdeck_shared::auth::password::hash_password;
use taskdeck_shared::models::user::{CreateUser, User};
use taskdeck_shared::store::memory::MemoryStore;
use taskdeck_shared::store::Store;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

pub const PASSWORD: &str = "Correct-Horse-42";

/// Response status, headers and parsed JSON body (`Null` when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
    pub config: Config,
}

pub fn test_config(production: bool) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
            production,
        },
        storage: StorageBackend::Memory,
        database: None,
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config(false))
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config.clone());

        TestContext {
            store,
            app: build_router(state),
            config,
        }
    }

    /// Creates a user directly in the store with [`PASSWORD`]
    pub async fn create_user(&self, email: &str) -> User {
        self.store
            .create_user(CreateUser {
                email: email.to_string(),
                name: "Test User".to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
            })
            .await
            .unwrap()
    }

    /// Creates a user and returns it with a valid access token
    pub async fn user_with_token(&self) -> (User, String) {
        let user = self
            .create_user(&format!("test-{}@example.com", Uuid::new_v4()))
            .await;
        let token = self.token_for(user.id);
        (user, token)
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        create_token(&Claims::new(user_id, TokenType::Access), &self.config.jwt.secret).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!(
                    "Expected JSON body, got {}: {}",
                    status,
                    String::from_utf8_lossy(&bytes)
                )
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Sends a request with an optional bearer token and JSON body
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.call(Method::DELETE, uri, Some(token), None).await
    }
}

/// Field names listed in a validation error body
pub fn error_fields(body: &Value) -> Vec<String> {
    body["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
