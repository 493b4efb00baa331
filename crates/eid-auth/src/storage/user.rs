//! User storage trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::certificate::Identity;
use crate::types::User;

/// Storage operations for users.
///
/// # Example
///
/// ```ignore
/// use eid_auth::storage::UserStorage;
///
/// async fn example(storage: &impl UserStorage, identity: &Identity) {
///     let user = storage.upsert_identity(identity).await?;
///     println!("signed in {}", user.identity_number);
/// }
/// ```
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Find a user by ID.
    ///
    /// # Returns
    ///
    /// Returns `Some(user)` if found, `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    /// Find a user by identity number (e.g. `PNOEE-60001017869`).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_identity_number(&self, identity_number: &str) -> AuthResult<Option<User>>;

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if a user with the same identity number already
    /// exists or the storage operation fails.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Update an existing user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist, or a
    /// storage error if the operation fails.
    async fn update(&self, user: &User) -> AuthResult<()>;

    /// Creates the user for an identity, or refreshes the name and personal
    /// code of the existing one.
    ///
    /// Backends with a native upsert should override this to make it a
    /// single statement.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the underlying operations fail.
    async fn upsert_identity(&self, identity: &Identity) -> AuthResult<User> {
        match self
            .find_by_identity_number(&identity.identity_number)
            .await?
        {
            Some(mut user) => {
                user.apply_identity(identity);
                self.update(&user).await?;
                Ok(user)
            }
            None => {
                let user = User::from_identity(identity);
                self.create(&user).await?;
                Ok(user)
            }
        }
    }
}
