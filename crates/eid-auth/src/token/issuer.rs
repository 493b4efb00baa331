//! Token issuer.
//!
//! Turns a user plus their authorization graph into a signed access/refresh
//! pair and records the issuance.
//!
//! # Usage
//!
//! ```ignore
//! use eid_auth::token::{TokenConfig, TokenIssuer};
//!
//! let issuer = TokenIssuer::new(jwt, users, authorization, tokens, TokenConfig::default());
//! let pair = issuer.generate(&user).await?;
//! ```

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::config::{AuthConfig, ConfigError, MAX_TOKEN_LIFETIME};
use crate::error::AuthError;
use crate::storage::{AuthorizationResolver, TokenStorage, UserStorage};
use crate::token::jwt::{AccessClaims, JwtService, RefreshClaims};
use crate::types::{Token, TokenType, User};

/// Lifetimes of issued tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Access token lifetime.
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    pub refresh_token_lifetime: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: Duration::minutes(30),
            refresh_token_lifetime: Duration::hours(24),
        }
    }
}

impl TokenConfig {
    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }
}

impl TryFrom<&AuthConfig> for TokenConfig {
    type Error = ConfigError;

    fn try_from(config: &AuthConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            access_token_lifetime: token_lifetime(
                "access_token_lifetime",
                config.access_token_lifetime,
            )?,
            refresh_token_lifetime: token_lifetime(
                "refresh_token_lifetime",
                config.refresh_token_lifetime,
            )?,
        })
    }
}

fn token_lifetime(name: &str, value: std::time::Duration) -> Result<Duration, ConfigError> {
    if value > MAX_TOKEN_LIFETIME {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must be at most {}s",
            MAX_TOKEN_LIFETIME.as_secs()
        )));
    }
    Duration::try_from(value)
        .map_err(|e| ConfigError::InvalidValue(format!("{name} is out of range: {e}")))
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Access token.
    pub access: Token,
    /// Refresh token.
    pub refresh: Token,
}

/// Issues and refreshes token pairs.
pub struct TokenIssuer {
    jwt: Arc<JwtService>,
    users: Arc<dyn UserStorage>,
    authorization: Arc<dyn AuthorizationResolver>,
    tokens: Arc<dyn TokenStorage>,
    config: TokenConfig,
}

impl TokenIssuer {
    /// Creates a new token issuer.
    #[must_use]
    pub fn new(
        jwt: Arc<JwtService>,
        users: Arc<dyn UserStorage>,
        authorization: Arc<dyn AuthorizationResolver>,
        tokens: Arc<dyn TokenStorage>,
        config: TokenConfig,
    ) -> Self {
        Self {
            jwt,
            users,
            authorization,
            tokens,
            config,
        }
    }

    /// Mints and records a token pair for a user.
    ///
    /// The access token carries the user's role, permission and scope names;
    /// the refresh token carries only the subject.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the authorization graph, signing, or
    /// recording the pair fails. No tokens are returned in that case.
    pub async fn generate(&self, user: &User) -> AuthResult<TokenPair> {
        let (roles, permissions, scopes) = tokio::try_join!(
            self.authorization.roles(user.id),
            self.authorization.permissions(user.id),
            self.authorization.scopes(user.id),
        )?;

        let access_claims = AccessClaims::new(
            self.jwt.issuer(),
            &user.identity_number,
            self.config.access_token_lifetime.whole_seconds(),
        )
        .with_grants(roles, permissions, scopes);
        let refresh_claims = RefreshClaims::new(
            self.jwt.issuer(),
            &user.identity_number,
            self.config.refresh_token_lifetime.whole_seconds(),
        );

        let access = Token {
            token_type: TokenType::Access,
            value: self.jwt.encode(&access_claims)?,
            user_id: user.id,
            expires_at: expiry(access_claims.exp)?,
        };
        let refresh = Token {
            token_type: TokenType::Refresh,
            value: self.jwt.encode(&refresh_claims)?,
            user_id: user.id,
            expires_at: expiry(refresh_claims.exp)?,
        };

        self.tokens.store_pair(&access, &refresh).await?;

        tracing::info!(
            user_id = %user.id,
            roles = access_claims.roles.len(),
            permissions = access_claims.permissions.len(),
            scopes = access_claims.scopes.len(),
            "Issued token pair"
        );

        Ok(TokenPair { access, refresh })
    }

    /// Exchanges a refresh token for the user and a fresh pair.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidToken` if the token is empty, malformed, signed
    ///   by another key, or not a refresh token
    /// - `AuthError::TokenExpired` if the token has expired
    /// - `AuthError::UserNotFound` if the subject no longer exists
    /// - any error from [`Self::generate`]
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<(User, TokenPair)> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::invalid_token("refresh token is empty"));
        }

        let claims = self.jwt.decode_refresh(refresh_token)?;
        let user = self
            .users
            .find_by_identity_number(&claims.sub)
            .await?
            .ok_or_else(|| AuthError::user_not_found(claims.sub.clone()))?;

        let pair = self.generate(&user).await?;
        Ok((user, pair))
    }

    /// Returns the JWT service.
    #[must_use]
    pub fn jwt_service(&self) -> &Arc<JwtService> {
        &self.jwt
    }
}

fn expiry(exp: i64) -> AuthResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(exp)
        .map_err(|e| AuthError::internal(format!("token expiry out of range: {e}")))
}
