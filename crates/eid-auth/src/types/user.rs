//! User domain type.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::certificate::Identity;

/// A resolved human identity.
///
/// Role, permission and scope assignments live in the authorization graph and
/// are resolved at token issuance, not cached here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,

    /// Provider-namespaced identity number, e.g. `PNOEE-60001017869`.
    pub identity_number: String,

    /// National personal code.
    pub personal_code: String,

    /// Given name.
    pub first_name: String,

    /// Family name.
    pub last_name: String,

    /// When the user was first seen.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the user's attributes were last refreshed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Creates a new user from an extracted identity.
    #[must_use]
    pub fn from_identity(identity: &Identity) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            identity_number: identity.identity_number.clone(),
            personal_code: identity.personal_code.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the name and personal code with a fresher identity.
    pub fn apply_identity(&mut self, identity: &Identity) {
        self.personal_code = identity.personal_code.clone();
        self.first_name = identity.first_name.clone();
        self.last_name = identity.last_name.clone();
        self.updated_at = OffsetDateTime::now_utc();
    }
}
