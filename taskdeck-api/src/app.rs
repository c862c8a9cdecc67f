//! Application state and router builder
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskdeck_api::{app::{build_router, AppState}, config::Config};
//! use taskdeck_shared::store::memory::MemoryStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let state = AppState::new(Arc::new(MemoryStore::new()), config);
//! let app = build_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::{sync::Arc, time::Duration};
use taskdeck_shared::{
    access::Access,
    auth::middleware::{require_auth, AuthContext, IdentityResolver},
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Data access scoped to the authenticated caller
    pub fn access(&self, auth: &AuthContext) -> Access {
        Access::new(self.store.clone(), auth.user_id)
    }

    pub fn resolver(&self) -> IdentityResolver {
        IdentityResolver::new(self.store.clone(), self.jwt_secret())
    }
}

/// Builds the complete router
///
/// ```text
/// /health                        public
/// /v1/
/// ├── /auth/
/// │   ├── POST /register         public
/// │   ├── POST /login            public
/// │   ├── POST /refresh          public
/// │   ├── POST /logout           public
/// │   └── GET  /me               authenticated
/// ├── /projects, /projects/:id   authenticated
/// ├── /tasks, /tasks/:id         authenticated
/// ├── /categories                authenticated
/// └── /dashboard                 authenticated
/// ```
///
/// Layers, outermost first: security headers, CORS, request tracing.
pub fn build_router(state: AppState) -> Router {
    let auth_guard = axum::middleware::from_fn_with_state(state.resolver(), require_auth);

    // route_layer guards only the routes added before it
    let auth_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route_layer(auth_guard.clone())
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout));

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects)
                .post(routes::projects::create_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/:id", get(routes::projects::get_project))
        .layer(auth_guard.clone());

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks)
                .post(routes::tasks::create_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id", get(routes::tasks::get_task))
        .layer(auth_guard.clone());

    let category_routes = Router::new()
        .route(
            "/",
            get(routes::categories::list_categories)
                .post(routes::categories::create_category)
                .delete(routes::categories::delete_category),
        )
        .layer(auth_guard.clone());

    let dashboard_routes = Router::new()
        .route("/", get(routes::dashboard::stats))
        .layer(auth_guard);

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/categories", category_routes)
        .nest("/dashboard", dashboard_routes);

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Empty list or `*` allows any origin (without credentials)
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
