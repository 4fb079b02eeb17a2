// Redis-backed token denylist

use axum::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;

use crate::auth::{error::AuthError, store::TokenDenylist};

const KEY_PREFIX: &str = "colmena:revoked:";

/// Stores each revoked fingerprint as a key that Redis expires on its own
#[derive(Clone)]
pub struct RedisDenylist {
    connection: ConnectionManager,
}

impl RedisDenylist {
    pub async fn connect(redis_url: &str) -> Result<Self, AuthError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AuthError::ConfigError(format!("invalid REDIS_URL: {}", e)))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        tracing::info!("Connected to Redis token denylist");
        Ok(Self { connection })
    }

    fn key(fingerprint: &str) -> String {
        format!("{}{}", KEY_PREFIX, fingerprint)
    }
}

#[async_trait]
impl TokenDenylist for RedisDenylist {
    async fn contains(&self, fingerprint: &str) -> Result<bool, AuthError> {
        let mut conn = self.connection.clone();
        redis::cmd("EXISTS")
            .arg(Self::key(fingerprint))
            .query_async::<_, bool>(&mut conn)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }

    async fn insert(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        let ttl = (expires_at - Utc::now()).num_seconds();
        if ttl <= 0 {
            // already unusable, nothing to remember
            return Ok(());
        }

        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(Self::key(fingerprint))
            .arg(1)
            .arg("EX")
            .arg(ttl)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }
}
