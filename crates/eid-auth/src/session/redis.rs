//! Redis session store.
//!
//! Sessions are stored as JSON under `session:{id}` with `SET EX`, so Redis
//! enforces the TTL.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use ::redis::AsyncCommands;

use super::SessionStore;
use crate::AuthResult;
use crate::error::AuthError;
use crate::types::Session;

const KEY_PREFIX: &str = "session:";

/// Session store backed by a Redis connection pool.
#[derive(Clone)]
pub struct RedisSessionStore {
    pool: Pool,
    ttl: Duration,
}

impl RedisSessionStore {
    /// Creates a new store over an existing pool.
    #[must_use]
    pub fn new(pool: Pool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Returns the Redis key of a session.
    #[must_use]
    pub fn key(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    /// Checks that a connection can be obtained.
    pub async fn is_available(&self) -> bool {
        self.pool.get().await.is_ok()
    }

    async fn connection(&self) -> AuthResult<Connection> {
        self.pool.get().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to get Redis connection");
            AuthError::storage(format!("redis pool: {e}"))
        })
    }

    async fn put(&self, session: &Session) -> AuthResult<()> {
        let value = serde_json::to_string(session)
            .map_err(|e| AuthError::storage(format!("serialize session: {e}")))?;
        let key = Self::key(&session.id);
        let ttl_secs = self.ttl.as_secs().max(1);

        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(&key, value, ttl_secs)
            .await
            .map_err(|e| {
                tracing::warn!(key = %key, error = %e, "Redis SET error");
                AuthError::storage(format!("redis SET: {e}"))
            })?;
        tracing::debug!(key = %key, ttl_secs, "session stored");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        self.put(session).await
    }

    async fn update(&self, session: &Session) -> AuthResult<()> {
        self.put(session).await
    }

    async fn find_by_id(&self, id: &str) -> AuthResult<Session> {
        let key = Self::key(id);
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(&key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis GET error");
            AuthError::storage(format!("redis GET: {e}"))
        })?;

        let value = value.ok_or_else(|| AuthError::session_not_found(id))?;
        serde_json::from_str(&value)
            .map_err(|e| AuthError::storage(format!("corrupt session {id}: {e}")))
    }

    async fn take(&self, id: &str) -> AuthResult<Option<Session>> {
        let key = Self::key(id);
        let mut conn = self.connection().await?;
        // GETDEL needs Redis 6.2 or newer.
        let value: Option<String> = conn.get_del(&key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis GETDEL error");
            AuthError::storage(format!("redis GETDEL: {e}"))
        })?;

        value
            .map(|v| {
                serde_json::from_str(&v)
                    .map_err(|e| AuthError::storage(format!("corrupt session {id}: {e}")))
            })
            .transpose()
    }

    async fn delete(&self, id: &str) -> AuthResult<()> {
        let key = Self::key(id);
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(&key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis DEL error");
            AuthError::storage(format!("redis DEL: {e}"))
        })
    }
}
