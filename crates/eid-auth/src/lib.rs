//! # eid-auth
//!
//! Smart-ID / Mobile-ID backed authentication for the eid-auth service.
//!
//! This crate provides:
//! - Authentication sessions tracked in a TTL-bounded session store
//! - Identity provider clients for Smart-ID and Mobile-ID
//! - A polling worker pool that drives sessions to a terminal state
//! - Certificate-based identity extraction
//! - JWT access/refresh token issuance with roles, permissions and scopes
//!
//! ## Overview
//!
//! A caller starts a ceremony through [`AuthenticationService::create_session`],
//! which persists a `RUNNING` session and hands the session id to the
//! [`SessionPoller`] of the matching provider. The poller long-polls the
//! provider until the attempt resolves and records the outcome. Once the
//! caller observes `SUCCESS`, [`AuthenticationService::complete`] mints a token
//! pair and removes the session.
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration
//! - [`session`] - Session store trait and Redis / in-memory stores
//! - [`provider`] - Identity provider capability and REST clients
//! - [`certificate`] - Identity extraction from provider certificates
//! - [`storage`] - Storage traits for users, authorization graph and tokens
//! - [`token`] - JWT signing and the token issuer
//! - [`worker`] - Session polling worker pool
//! - [`service`] - Authentication orchestrator
//! - [`http`] - Axum HTTP handlers and router

pub mod certificate;
pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod service;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;
pub mod worker;

pub use certificate::{Identity, extract_identity};
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use provider::{IdentityProvider, ProviderKind, StartRequest};
pub use service::{AuthenticationService, CompletedAuthentication, SessionCreated};
pub use session::{MemorySessionStore, RedisSessionStore, SessionStore};
pub use storage::{AuthorizationResolver, TokenStorage, UserStorage};
pub use token::{TokenIssuer, TokenPair};
pub use types::{Session, SessionStatus, Token, TokenType, User};
pub use worker::SessionPoller;

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;
