//! # TaskDeck API Server
//!
//! Personal task and project manager: every request is resolved to a user and
//! every read or write is scoped to that user's own projects and tasks.
//!
//! ## Usage
//!
//! ```bash
//! STORAGE_BACKEND=memory JWT_SECRET=... cargo run -p taskdeck-api
//! ```

use std::sync::Arc;
use taskdeck_api::{
    app::{build_router, AppState},
    config::{Config, StorageBackend},
};
use taskdeck_shared::{
    db::{
        migrations::{get_migration_status, run_migrations},
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::{memory::MemoryStore, postgres::PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskdeck_api=debug,taskdeck_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskDeck API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let mut pool = None;
    let store: Arc<dyn Store> = match (config.storage, &config.database) {
        (StorageBackend::Postgres, Some(database)) => {
            let pg = create_pool(DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                ..Default::default()
            })
            .await?;

            run_migrations(&pg).await?;
            let status = get_migration_status(&pg).await?;
            tracing::info!(
                applied = status.applied_migrations,
                latest = ?status.latest_version,
                "Database schema ready"
            );

            pool = Some(pg.clone());
            Arc::new(PgStore::new(pg))
        }
        (StorageBackend::Postgres, None) => {
            anyhow::bail!("Postgres storage selected without database configuration")
        }
        (StorageBackend::Memory, _) => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
