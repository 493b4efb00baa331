//! Axum HTTP handlers for the authentication flow.
//!
//! # Routes
//!
//! | method | path | handler |
//! |---|---|---|
//! | `POST` | `/auth/mobile-id` | [`session::create_mobile_id`] |
//! | `POST` | `/auth/smart-id` | [`session::create_smart_id`] |
//! | `GET` | `/auth/sessions/{id}` | [`session::status`] |
//! | `GET`, `POST` | `/auth/sessions/{id}/complete` | [`session::complete`] |
//! | `POST` | `/auth/token/refresh` | [`token::refresh`] |
//! | `GET` | `/.well-known/jwks.json` | [`jwks::jwks_handler`] |

pub mod error;
pub mod jwks;
pub mod session;
pub mod token;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use uuid::Uuid;

use crate::service::AuthenticationService;

/// Header carrying the caller's trace id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared state of the handlers.
#[derive(Clone)]
pub struct AppState {
    /// The authentication orchestrator.
    pub service: Arc<AuthenticationService>,
}

impl AppState {
    /// Creates a new state.
    pub fn new(service: Arc<AuthenticationService>) -> Self {
        Self { service }
    }
}

/// Builds the authentication router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/mobile-id", post(session::create_mobile_id))
        .route("/auth/smart-id", post(session::create_smart_id))
        .route("/auth/sessions/{id}", get(session::status))
        .route(
            "/auth/sessions/{id}/complete",
            get(session::complete).post(session::complete),
        )
        .route("/auth/token/refresh", post(token::refresh))
        .route("/.well-known/jwks.json", get(jwks::jwks_handler))
        .with_state(state)
}

/// Returns the request's trace id, or a fresh one.
pub(crate) fn trace_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
