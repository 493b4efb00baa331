//! PostgreSQL storage backend for eid-auth
//!
//! Provides persistent storage for:
//!
//! - Users resolved from provider certificates
//! - The authorization graph (roles, permissions, scopes)
//! - Issued token pairs
//!
//! # Example
//!
//! ```ignore
//! use eid_auth_postgres::PostgresAuthStorage;
//!
//! let storage = PostgresAuthStorage::connect("postgres://localhost/eid_auth", 10).await?;
//! storage.migrate().await?;
//!
//! let users = storage.users();
//! let user = users.find_by_identity_number("PNOEE-60001017869").await?;
//! ```

pub mod authorization;
pub mod migrations;
pub mod token;
pub mod user;

use std::sync::Arc;

use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

use eid_auth::AuthError;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use authorization::PgAuthorizationResolver;
pub use token::PgTokenStorage;
pub use user::PgUserStorage;

/// SQLSTATE of a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(sqlx_core::Error),

    /// Requested record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl StorageError {
    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl From<sqlx_core::Error> for StorageError {
    fn from(e: sqlx_core::Error) -> Self {
        let unique_violation = e
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == UNIQUE_VIOLATION);
        if unique_violation {
            Self::Conflict(e.to_string())
        } else {
            Self::Database(e)
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(user) => AuthError::user_not_found(user),
            other => AuthError::storage(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend for authentication data.
///
/// Holds the connection pool and hands out the trait implementations used by
/// the authentication service.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Migration` if a migration fails.
    pub async fn migrate(&self) -> StorageResult<()> {
        migrations::run(&self.pool).await
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -------------------------------------------------------------------------
    // Storage Accessors
    // -------------------------------------------------------------------------

    /// User storage.
    #[must_use]
    pub fn users(&self) -> PgUserStorage {
        PgUserStorage::new(Arc::clone(&self.pool))
    }

    /// Authorization graph resolver.
    #[must_use]
    pub fn authorization(&self) -> PgAuthorizationResolver {
        PgAuthorizationResolver::new(Arc::clone(&self.pool))
    }

    /// Issued token storage.
    #[must_use]
    pub fn tokens(&self) -> PgTokenStorage {
        PgTokenStorage::new(Arc::clone(&self.pool))
    }
}

// =============================================================================
// Tests
// =============================================================================
