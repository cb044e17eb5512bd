use forum_core::cache::{MemoryCache, SessionCache};
use forum_core::config::Config;
use forum_core::database::{create_pool, run_migrations};
use forum_core::redis::RedisClient;
use forum_core::stores::{MemoryStore, PgStore};
use forum_core::{AppState, create_app};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forum_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("JWT_SECRET must be set: {e}"))?;
    tracing::info!("Configuration loaded successfully");

    // Session cache
    let cache: Arc<dyn SessionCache> = match &config.redis_url {
        Some(url) => {
            let redis = RedisClient::new(url).await?;
            tracing::info!("Redis client created");
            Arc::new(redis)
        }
        None => {
            tracing::warn!("REDIS_URL not set, sessions are kept in memory");
            Arc::new(MemoryCache::new())
        }
    };

    // Stores
    let state = match &config.database_url {
        Some(url) => {
            let db = create_pool(url).await?;
            tracing::info!("Database connection pool created");
            run_migrations(&db).await?;
            tracing::info!("Database migrations completed");
            AppState::new(config.clone(), Arc::new(PgStore::new(db)), cache)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            AppState::new(config.clone(), Arc::new(MemoryStore::new()), cache)
        }
    };

    // Create application
    let app = create_app(state);

    // Create listener
    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    tracing::info!("Server listening on {}:{}", config.host, config.port);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
