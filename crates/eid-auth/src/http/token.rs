//! Token refresh handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::AuthError;

/// Body of `POST /auth/token/refresh`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshRequest {
    /// Refresh token issued by a previous completion or refresh.
    pub refresh_token: String,
}

/// Response of `POST /auth/token/refresh`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// New access token.
    pub access_token: String,
    /// New refresh token.
    pub refresh_token: String,
}

/// Handler for `POST /auth/token/refresh`.
///
/// An empty token is a 400; an invalid or expired one is a 422.
pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, AuthError> {
    let Json(body) = body?;
    if body.refresh_token.trim().is_empty() {
        return Err(AuthError::invalid_request("refreshToken is required"));
    }

    let completed = state.service.refresh(&body.refresh_token).await?;
    Ok(Json(RefreshResponse {
        access_token: completed.tokens.access.value,
        refresh_token: completed.tokens.refresh.value,
    }))
}
