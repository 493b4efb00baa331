//! Error responses.
//!
//! `InvalidRequest` maps to 400, missing sessions and users to 404, and every
//! other failure to 422. The body is `{"error": <code>, "message": <text>}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_code(&self);

        let message = if self.is_server_error() {
            tracing::error!(
                error = %self,
                category = %self.category(),
                "Request failed"
            );
            // storage and internal details stay in the logs
            match &self {
                Self::IdentityProvider { .. } => self.to_string(),
                _ => "The request could not be processed".to_string(),
            }
        } else {
            tracing::debug!(error = %self, category = %self.category(), "Request rejected");
            self.to_string()
        };

        let body = json!({
            "error": self.code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

/// Returns the HTTP status for an error.
#[must_use]
pub fn status_code(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        AuthError::SessionNotFound { .. } | AuthError::UserNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::invalid_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_code(&AuthError::invalid_request("x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code(&AuthError::session_not_found("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code(&AuthError::user_not_found("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code(&AuthError::session_not_ready("x")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_code(&AuthError::TokenExpired),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_code(&AuthError::storage("x")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_error_body() {
        let response = AuthError::session_not_found("abc").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "SESSION_NOT_FOUND");
        assert_eq!(body["message"], "Session not found: abc");
    }

    #[tokio::test]
    async fn test_storage_details_are_hidden() {
        let response = AuthError::storage("password=hunter2").into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "STORAGE_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("hunter2"));
    }
}
