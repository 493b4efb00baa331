//! Issued token storage.
//!
//! Only the SHA-256 fingerprint of each token is stored.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use uuid::Uuid;

use eid_auth::storage::TokenStorage;
use eid_auth::{AuthResult, Token};

use crate::{PgPool, StorageError};

const INSERT_SQL: &str = r#"
    INSERT INTO tokens (id, token_hash, token_type, user_id, expires_at)
    VALUES ($1, $2, $3, $4, $5)
"#;

/// PostgreSQL token storage.
#[derive(Debug, Clone)]
pub struct PgTokenStorage {
    pool: Arc<PgPool>,
}

impl PgTokenStorage {
    /// Create a new token storage.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStorage for PgTokenStorage {
    async fn store_pair(&self, access: &Token, refresh: &Token) -> AuthResult<()> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        for token in [access, refresh] {
            query(INSERT_SQL)
                .bind(Uuid::new_v4())
                .bind(token.fingerprint())
                .bind(token.token_type.as_str())
                .bind(token.user_id)
                .bind(token.expires_at)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }

        // dropping the transaction without commit rolls it back
        tx.commit().await.map_err(StorageError::from)?;

        tracing::debug!(user_id = %access.user_id, "Recorded token pair");
        Ok(())
    }
}
