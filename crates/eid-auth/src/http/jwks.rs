//! JWKS endpoint.
//!
//! Publishes the public half of the signing key at `/.well-known/jwks.json`
//! so resource servers can verify access tokens. HS256 deployments publish an
//! empty key set.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use super::AppState;

/// Handler for `GET /.well-known/jwks.json`.
///
/// Responses may be cached for an hour.
pub async fn jwks_handler(State(state): State<AppState>) -> impl IntoResponse {
    let jwks = state.service.jwt_service().jwks();
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(jwks),
    )
}
