//! Issued token storage trait.
//!
//! # Security
//!
//! Implementations persist only [`Token::fingerprint`], never the value.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Token;

/// Records issued tokens.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Records an access/refresh pair.
    ///
    /// # Atomicity
    ///
    /// Either both tokens are recorded or neither is. Relational backends
    /// wrap both inserts in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails; nothing is recorded
    /// in that case.
    async fn store_pair(&self, access: &Token, refresh: &Token) -> AuthResult<()>;
}
