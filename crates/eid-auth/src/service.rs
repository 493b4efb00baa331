//! Authentication orchestrator.
//!
//! [`AuthenticationService`] is the façade the HTTP layer talks to. It starts
//! provider ceremonies, hands the resulting sessions to the provider's
//! [`SessionPoller`], and exchanges successful sessions for tokens.
//!
//! # Usage
//!
//! ```ignore
//! let service = AuthenticationService::new(sessions, users, issuer)
//!     .with_provider(Arc::new(MobileIdClient::new(config.mobile_id)?), PollerConfig::default());
//! service.start();
//!
//! let created = service.create_session(request, &trace_id).await?;
//! // ... caller polls get_status until SUCCESS ...
//! let completed = service.complete(&created.id).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashSet;
use serde::Serialize;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::provider::{IdentityProvider, MobileIdClient, ProviderKind, SmartIdClient, StartRequest};
use crate::session::SessionStore;
use crate::storage::UserStorage;
use crate::token::{JwtService, TokenIssuer, TokenPair};
use crate::types::{Session, SessionStatus, User};
use crate::worker::{PollTask, PollerConfig, SessionPoller};

/// Result of starting a ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionCreated {
    /// Session id, equal to the provider session id.
    pub id: String,
    /// Verification code to display to the user.
    pub code: String,
}

/// A consumed session: the user and their fresh tokens.
#[derive(Debug, Clone)]
pub struct CompletedAuthentication {
    /// The authenticated user.
    pub user: User,
    /// Freshly minted tokens.
    pub tokens: TokenPair,
}

/// Coordinates providers, the session store, polling and token issuance.
pub struct AuthenticationService {
    pollers: HashMap<ProviderKind, Arc<SessionPoller>>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStorage>,
    issuer: Arc<TokenIssuer>,
    completing: DashSet<String>,
}

impl AuthenticationService {
    /// Creates a service with no providers registered.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStorage>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            pollers: HashMap::new(),
            sessions,
            users,
            issuer,
            completing: DashSet::new(),
        }
    }

    /// Builds a service with the providers enabled in `config`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if a provider client cannot be
    /// built.
    pub fn from_config(
        config: &AuthConfig,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStorage>,
        issuer: Arc<TokenIssuer>,
    ) -> AuthResult<Self> {
        let mut service = Self::new(sessions, users, issuer);

        if config.smart_id.enabled {
            let pool = PollerConfig {
                workers: config.smart_id.workers,
                queue_capacity: config.smart_id.queue_capacity,
            };
            let client = SmartIdClient::new(config.smart_id.clone())?;
            service = service.with_provider(Arc::new(client), pool);
        }

        if config.mobile_id.enabled {
            let pool = PollerConfig {
                workers: config.mobile_id.workers,
                queue_capacity: config.mobile_id.queue_capacity,
            };
            let client = MobileIdClient::new(config.mobile_id.clone())?;
            service = service.with_provider(Arc::new(client), pool);
        }

        Ok(service)
    }

    /// Registers a provider with its own worker pool.
    ///
    /// A second provider of the same kind replaces the first.
    #[must_use]
    pub fn with_provider(
        mut self,
        provider: Arc<dyn IdentityProvider>,
        config: PollerConfig,
    ) -> Self {
        let kind = provider.kind();
        let poller = SessionPoller::new(
            provider,
            Arc::clone(&self.sessions),
            Arc::clone(&self.users),
            config,
        );
        self.pollers.insert(kind, Arc::new(poller));
        self
    }

    /// Returns the registered provider kinds.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.pollers.keys().copied().collect()
    }

    /// Returns the JWT service used to sign tokens.
    #[must_use]
    pub fn jwt_service(&self) -> &Arc<JwtService> {
        self.issuer.jwt_service()
    }

    /// Starts every worker pool.
    pub fn start(&self) {
        for poller in self.pollers.values() {
            poller.start();
        }
    }

    /// Stops every worker pool, waiting for in-flight sessions.
    pub async fn shutdown(&self) {
        let mut stops = tokio::task::JoinSet::new();
        for poller in self.pollers.values() {
            let poller = Arc::clone(poller);
            stops.spawn(async move { poller.stop().await });
        }
        while let Some(result) = stops.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Session poller shutdown task failed");
            }
        }
    }

    /// Starts a ceremony and schedules its session for polling.
    ///
    /// Returns as soon as the session is persisted and queued.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidRequest` if the request is malformed or its
    ///   provider is not enabled
    /// - `AuthError::IdentityProvider` if the provider rejects the start
    /// - `AuthError::Storage` if the session cannot be persisted
    /// - `AuthError::Internal` if the polling queue is full
    pub async fn create_session(
        &self,
        request: StartRequest,
        trace_id: &str,
    ) -> AuthResult<SessionCreated> {
        request.validate()?;

        let kind = request.kind();
        let poller = self.pollers.get(&kind).ok_or_else(|| {
            AuthError::invalid_request(format!("identity provider {kind} is not enabled"))
        })?;

        let ceremony = poller
            .provider()
            .start(&request)
            .await
            .map_err(|e| e.into_auth_error(kind))?;

        let session = Session::new(&ceremony.session_id, &ceremony.verification_code);
        self.sessions.create(&session).await?;

        if let Err(e) = poller.enqueue(PollTask::new(&session.id, trace_id)) {
            if let Err(delete_err) = self.sessions.delete(&session.id).await {
                tracing::warn!(
                    session_id = %session.id,
                    error = %delete_err,
                    "Failed to remove unqueued session"
                );
            }
            return Err(e);
        }

        tracing::info!(
            provider = %kind,
            session_id = %session.id,
            trace_id = %trace_id,
            "Authentication session created"
        );

        Ok(SessionCreated {
            id: session.id,
            code: session.code,
        })
    }

    /// Reads a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionNotFound` if the session is absent or
    /// expired.
    pub async fn get_status(&self, session_id: &str) -> AuthResult<Session> {
        self.sessions.find_by_id(session_id).await
    }

    /// Exchanges a successful session for the user and a fresh token pair.
    ///
    /// The session is claimed with [`SessionStore::take`] before tokens are
    /// minted, so only one request across all instances completes it. If
    /// issuance fails the claimed record is written back.
    ///
    /// # Errors
    ///
    /// - `AuthError::SessionNotFound` if the session is absent or expired
    /// - `AuthError::SessionNotReady` if it is still running, has failed, or
    ///   is being completed by another request on this or another instance
    /// - `AuthError::UserNotFound` if its user no longer exists
    /// - any error from [`TokenIssuer::generate`] or the session store
    pub async fn complete(&self, session_id: &str) -> AuthResult<CompletedAuthentication> {
        let _guard = CompletionGuard::acquire(&self.completing, session_id)?;

        let session = self.sessions.find_by_id(session_id).await?;
        let user_id = match (session.status, session.user_id) {
            (SessionStatus::Success, Some(user_id)) => user_id,
            (SessionStatus::Success, None) => {
                return Err(AuthError::session_not_ready("session has no user"));
            }
            (SessionStatus::Running, _) => {
                return Err(AuthError::session_not_ready("authentication is still running"));
            }
            (SessionStatus::Error, _) => {
                return Err(AuthError::session_not_ready(format!(
                    "authentication failed: {}",
                    session.error.as_deref().unwrap_or("UNKNOWN")
                )));
            }
        };

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::user_not_found(user_id.to_string()))?;

        let claimed = self
            .sessions
            .take(session_id)
            .await?
            .ok_or_else(|| AuthError::session_not_ready("session is already being completed"))?;

        let tokens = match self.issuer.generate(&user).await {
            Ok(tokens) => tokens,
            Err(e) => {
                if let Err(restore) = self.sessions.create(&claimed).await {
                    tracing::warn!(
                        session_id = %session_id,
                        error = %restore,
                        "Failed to restore session after token issuance failure"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            session_id = %session_id,
            user_id = %user.id,
            "Authentication session completed"
        );

        Ok(CompletedAuthentication { user, tokens })
    }

    /// Exchanges a refresh token for the user and a fresh token pair.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::refresh`].
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<CompletedAuthentication> {
        let (user, tokens) = self.issuer.refresh(refresh_token).await?;
        Ok(CompletedAuthentication { user, tokens })
    }
}

/// Marks a session as being completed for the lifetime of the guard.
struct CompletionGuard<'a> {
    set: &'a DashSet<String>,
    session_id: String,
}

impl<'a> CompletionGuard<'a> {
    fn acquire(set: &'a DashSet<String>, session_id: &str) -> AuthResult<Self> {
        if !set.insert(session_id.to_string()) {
            return Err(AuthError::session_not_ready(
                "session is already being completed",
            ));
        }
        Ok(Self {
            set,
            session_id: session_id.to_string(),
        })
    }
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.session_id);
    }
}
