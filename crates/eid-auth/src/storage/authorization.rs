//! Authorization graph resolver trait.
//!
//! Roles, permissions and scopes are named entities joined to users through
//! many-to-many relations (user to role, role to permission, user to scope).
//! The resolver flattens the graph for one user into the names embedded in
//! access token claims.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;

/// Resolves a user's authorization graph.
///
/// Each method returns names, deduplicated and sorted, for the given user.
/// A user with no assignments resolves to empty lists.
#[async_trait]
pub trait AuthorizationResolver: Send + Sync {
    /// Returns the names of the user's roles.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn roles(&self, user_id: Uuid) -> AuthResult<Vec<String>>;

    /// Returns the names of the permissions granted through the user's roles.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn permissions(&self, user_id: Uuid) -> AuthResult<Vec<String>>;

    /// Returns the names of the user's scopes.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn scopes(&self, user_id: Uuid) -> AuthResult<Vec<String>>;
}
