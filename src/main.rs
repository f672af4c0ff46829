use campus_forum::config::Config;
use campus_forum::database::{create_pool, run_migrations};
use campus_forum::redis::RedisClient;
use campus_forum::store::{EngagementStore, MemoryEngagementStore, PgEngagementStore};
use campus_forum::{AppState, create_app};
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
                .unwrap_or_else(|_| "campus_forum=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let store: Arc<dyn EngagementStore> = match &config.database_url {
        Some(database_url) => {
            let db = create_pool(database_url).await?;
            tracing::info!("Database connection pool created");

            run_migrations(&db).await?;
            tracing::info!("Database migrations completed");

            Arc::new(PgEngagementStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory engagement store");
            Arc::new(MemoryEngagementStore::new())
        }
    };

    let redis = match &config.redis_url {
        Some(redis_url) => {
            let client = RedisClient::new(redis_url).await?;
            tracing::info!("Redis client created");
            Some(Arc::new(client))
        }
        None => {
            tracing::info!("REDIS_URL not set, rate limiting disabled");
            None
        }
    };

    let addr = format!("{}:{}", config.host, config.port);

    // Create application
    let state = AppState::new(store, redis, config);
    let app = create_app(state);

    // Create listener
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
