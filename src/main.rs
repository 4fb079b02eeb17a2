use std::{net::SocketAddr, sync::Arc, time::Duration};

use colmena_api::{
    auth::{
        redis_denylist::RedisDenylist,
        repository::{TokenRepository, UserRepository},
        AuthState, TokenCodec, TokenDenylist,
    },
    config::{AppConfig, DenylistBackend},
    create_router, db,
};
use tracing_subscriber::EnvFilter;

/// Interval between purges of expired rows in the Postgres denylist
const DENYLIST_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Colmena API - Starting...");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let denylist: Arc<dyn TokenDenylist> = match config.denylist_backend {
        DenylistBackend::Postgres => {
            let tokens = Arc::new(TokenRepository::new(db_pool.clone()));
            spawn_denylist_purge(tokens.clone());
            tokens
        }
        DenylistBackend::Redis => {
            // from_env guarantees REDIS_URL for this backend
            let url = config.redis_url.as_deref().unwrap_or_default();
            Arc::new(
                RedisDenylist::connect(url)
                    .await
                    .expect("Failed to connect to Redis"),
            )
        }
    };
    tracing::info!("Token denylist backend: {:?}", config.denylist_backend);

    let auth = AuthState::new(
        TokenCodec::new(&config.jwt),
        Arc::new(UserRepository::new(db_pool.clone())),
        denylist,
    );

    let app = create_router(
        db_pool,
        auth,
        config.require_https,
        Some(config.login_rate_limit),
    );

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Colmena API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    // Connect info feeds the per-IP login throttle
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("Server error");
}

/// Periodically deletes denylist rows whose tokens can no longer be presented
fn spawn_denylist_purge(tokens: Arc<TokenRepository>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(DENYLIST_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match tokens.delete_expired_tokens().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!("Purged {} expired denylist entries", purged),
                Err(e) => tracing::warn!("Denylist purge failed: {}", e),
            }
        }
    });
}
