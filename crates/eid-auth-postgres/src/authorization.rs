//! Authorization graph resolver.
//!
//! Flattens `user_roles`, `role_permissions` and `user_scopes` into the
//! names embedded in access tokens.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query_scalar::query_scalar;
use uuid::Uuid;

use eid_auth::AuthResult;
use eid_auth::storage::AuthorizationResolver;

use crate::{PgPool, StorageError};

const ROLES_SQL: &str = r#"
    SELECT r.name
    FROM roles r
    JOIN user_roles ur ON ur.role_id = r.id
    WHERE ur.user_id = $1
    ORDER BY r.name
"#;

const PERMISSIONS_SQL: &str = r#"
    SELECT DISTINCT p.name
    FROM permissions p
    JOIN role_permissions rp ON rp.permission_id = p.id
    JOIN user_roles ur ON ur.role_id = rp.role_id
    WHERE ur.user_id = $1
    ORDER BY p.name
"#;

const SCOPES_SQL: &str = r#"
    SELECT s.name
    FROM scopes s
    JOIN user_scopes us ON us.scope_id = s.id
    WHERE us.user_id = $1
    ORDER BY s.name
"#;

/// PostgreSQL authorization resolver.
#[derive(Debug, Clone)]
pub struct PgAuthorizationResolver {
    pool: Arc<PgPool>,
}

impl PgAuthorizationResolver {
    /// Create a new resolver.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn names(&self, sql: &'static str, user_id: Uuid) -> AuthResult<Vec<String>> {
        let names: Vec<String> = query_scalar(sql)
            .bind(user_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(names)
    }
}

#[async_trait]
impl AuthorizationResolver for PgAuthorizationResolver {
    async fn roles(&self, user_id: Uuid) -> AuthResult<Vec<String>> {
        self.names(ROLES_SQL, user_id).await
    }

    async fn permissions(&self, user_id: Uuid) -> AuthResult<Vec<String>> {
        self.names(PERMISSIONS_SQL, user_id).await
    }

    async fn scopes(&self, user_id: Uuid) -> AuthResult<Vec<String>> {
        self.names(SCOPES_SQL, user_id).await
    }
}
