//! User storage.
//!
//! Users are keyed by id and unique by identity number.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use eid_auth::storage::UserStorage;
use eid_auth::{AuthResult, Identity, User};

use crate::{PgPool, StorageError};

type UserTuple = (Uuid, String, String, String, String, OffsetDateTime, OffsetDateTime);

fn user_from_tuple(row: UserTuple) -> User {
    User {
        id: row.0,
        identity_number: row.1,
        personal_code: row.2,
        first_name: row.3,
        last_name: row.4,
        created_at: row.5,
        updated_at: row.6,
    }
}

/// PostgreSQL user storage.
#[derive(Debug, Clone)]
pub struct PgUserStorage {
    pool: Arc<PgPool>,
}

impl PgUserStorage {
    /// Create a new user storage.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStorage for PgUserStorage {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        let row: Option<UserTuple> = query_as(
            r#"
            SELECT id, identity_number, personal_code, first_name, last_name, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(user_from_tuple))
    }

    async fn find_by_identity_number(&self, identity_number: &str) -> AuthResult<Option<User>> {
        let row: Option<UserTuple> = query_as(
            r#"
            SELECT id, identity_number, personal_code, first_name, last_name, created_at, updated_at
            FROM users
            WHERE identity_number = $1
            "#,
        )
        .bind(identity_number)
        .fetch_optional(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(user_from_tuple))
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO users (id, identity_number, personal_code, first_name, last_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.identity_number)
        .bind(&user.personal_code)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        tracing::debug!(user_id = %user.id, "Created user");
        Ok(())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let result = query(
            r#"
            UPDATE users
            SET identity_number = $2,
                personal_code = $3,
                first_name = $4,
                last_name = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.identity_number)
        .bind(&user.personal_code)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(user.id.to_string()).into());
        }
        Ok(())
    }

    /// Single-statement upsert keyed on the identity number, so concurrent
    /// first logins of the same person resolve to one row.
    async fn upsert_identity(&self, identity: &Identity) -> AuthResult<User> {
        let candidate = User::from_identity(identity);
        let row: UserTuple = query_as(
            r#"
            INSERT INTO users (id, identity_number, personal_code, first_name, last_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (identity_number) DO UPDATE
            SET personal_code = EXCLUDED.personal_code,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                updated_at = EXCLUDED.updated_at
            RETURNING id, identity_number, personal_code, first_name, last_name, created_at, updated_at
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.identity_number)
        .bind(&candidate.personal_code)
        .bind(&candidate.first_name)
        .bind(&candidate.last_name)
        .bind(candidate.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(user_from_tuple(row))
    }
}
