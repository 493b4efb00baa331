//! Session handlers: start a ceremony, poll it, and complete it.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::{AppState, trace_id};
use crate::error::AuthError;
use crate::provider::StartRequest;
use crate::service::{CompletedAuthentication, SessionCreated};
use crate::types::{Session, SessionStatus};

/// Body of `POST /auth/mobile-id`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MobileIdRequest {
    /// National personal code.
    pub personal_code: String,
    /// Phone number, e.g. `+37268000769`.
    pub phone_number: String,
}

/// Body of `POST /auth/smart-id`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmartIdRequest {
    /// National personal code.
    pub personal_code: String,
    /// Two letter country code.
    pub country: String,
}

/// Body of `GET /auth/sessions/{id}`.
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    /// Session id.
    pub id: String,
    /// Session status.
    pub status: SessionStatus,
    /// Failure code, present when `status` is `ERROR`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Session> for SessionStatusResponse {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            status: session.status,
            error: session.error,
        }
    }
}

/// Body of `/auth/sessions/{id}/complete`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedResponse {
    /// User id.
    pub id: String,
    /// Identity number, e.g. `PNOEE-60001017869`.
    pub identity_number: String,
    /// National personal code.
    pub personal_code: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Signed access token.
    pub access_token: String,
    /// Signed refresh token.
    pub refresh_token: String,
}

impl From<CompletedAuthentication> for CompletedResponse {
    fn from(completed: CompletedAuthentication) -> Self {
        let CompletedAuthentication { user, tokens } = completed;
        Self {
            id: user.id.to_string(),
            identity_number: user.identity_number,
            personal_code: user.personal_code,
            first_name: user.first_name,
            last_name: user.last_name,
            access_token: tokens.access.value,
            refresh_token: tokens.refresh.value,
        }
    }
}

/// Handler for `POST /auth/mobile-id`.
///
/// Returns `201 {id, code}` once the ceremony has started.
pub async fn create_mobile_id(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<MobileIdRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(body) = body?;
    let request = StartRequest::MobileId {
        personal_code: body.personal_code,
        phone_number: body.phone_number,
    };
    create(&state, &headers, request).await
}

/// Handler for `POST /auth/smart-id`.
///
/// Returns `201 {id, code}` once the ceremony has started.
pub async fn create_smart_id(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SmartIdRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(body) = body?;
    let request = StartRequest::SmartId {
        personal_code: body.personal_code,
        country: body.country,
    };
    create(&state, &headers, request).await
}

async fn create(
    state: &AppState,
    headers: &HeaderMap,
    request: StartRequest,
) -> Result<(StatusCode, Json<SessionCreated>), AuthError> {
    let trace_id = trace_id(headers);
    let created = state.service.create_session(request, &trace_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for `GET /auth/sessions/{id}`.
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, AuthError> {
    let session = state.service.get_status(&id).await?;
    Ok(Json(session.into()))
}

/// Handler for `GET|POST /auth/sessions/{id}/complete`.
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CompletedResponse>, AuthError> {
    let completed = state.service.complete(&id).await?;
    Ok(Json(completed.into()))
}
