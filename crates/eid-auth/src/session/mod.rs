//! Session store trait and implementations.
//!
//! The session store is a TTL-bounded key-value mapping from session id to
//! [`Session`]. Every write overwrites the whole record and resets the TTL;
//! there is no partial-update API, so callers always read-modify-write.
//!
//! # Implementations
//!
//! - [`RedisSessionStore`] - Redis via `deadpool-redis`
//! - [`MemorySessionStore`] - in-process `DashMap`, for single-node
//!   deployments and tests

pub mod memory;
pub mod redis;

pub use memory::MemorySessionStore;
pub use redis::RedisSessionStore;

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Session;

/// Storage trait for authentication sessions.
///
/// The HTTP path creates and deletes sessions while the polling worker
/// updates them. Both write whole records, so implementations need no extra
/// locking beyond what the backend provides for a single key.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores a new session and starts its TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend is unavailable or the
    /// session cannot be serialized.
    async fn create(&self, session: &Session) -> AuthResult<()>;

    /// Overwrites an existing session and resets its TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend is unavailable or the
    /// session cannot be serialized.
    async fn update(&self, session: &Session) -> AuthResult<()>;

    /// Finds a session by id.
    ///
    /// # Errors
    ///
    /// - `AuthError::SessionNotFound` if the session is absent or expired
    /// - `AuthError::Storage` if the backend is unavailable or the record is
    ///   corrupt
    async fn find_by_id(&self, id: &str) -> AuthResult<Session>;

    /// Atomically removes a session and returns it.
    ///
    /// At most one caller receives a given record, including callers on
    /// other instances sharing the backend. Returns `Ok(None)` if the session
    /// is absent, expired, or already taken.
    ///
    /// # Errors
    ///
    /// - `AuthError::Storage` if the backend is unavailable or the record is
    ///   corrupt
    async fn take(&self, id: &str) -> AuthResult<Option<Session>>;

    /// Deletes a session. Deleting an absent session is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend is unavailable.
    async fn delete(&self, id: &str) -> AuthResult<()>;
}
