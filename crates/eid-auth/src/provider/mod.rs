//! Identity provider capability and clients.
//!
//! Both providers share one shape: `start` begins a remote ceremony and
//! returns the provider's session id plus a verification code to show the
//! user, and `check_status` long-polls that session until it resolves.
//!
//! - [`SmartIdClient`] - document-based Smart-ID
//! - [`MobileIdClient`] - phone-based Mobile-ID

pub mod hash;
pub mod mobile_id;
pub mod result;
pub mod smart_id;

pub use hash::{AuthenticationHash, HashType};
pub use mobile_id::MobileIdClient;
pub use result::ResultCode;
pub use smart_id::SmartIdClient;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::certificate::{Identity, extract_identity};
use crate::error::AuthError;
use crate::types::SessionPayload;

// ============================================================================
// Provider Kind
// ============================================================================

/// The identity provider variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Phone-based Mobile-ID.
    MobileId,
    /// Document-based Smart-ID.
    SmartId,
}

impl ProviderKind {
    /// Returns the provider name used in logs and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MobileId => "mobile-id",
            Self::SmartId => "smart-id",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Start Request
// ============================================================================

/// Provider-specific identity hint used to start a ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartRequest {
    /// Mobile-ID: personal code plus the phone number registered for it.
    MobileId {
        /// National personal code.
        personal_code: String,
        /// Phone number in international format, e.g. `+37268000769`.
        phone_number: String,
    },
    /// Smart-ID: personal code plus the issuing country.
    SmartId {
        /// National personal code.
        personal_code: String,
        /// ISO 3166-1 alpha-2 country code, e.g. `EE`.
        country: String,
    },
}

impl StartRequest {
    /// Returns the provider this request targets.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::MobileId { .. } => ProviderKind::MobileId,
            Self::SmartId { .. } => ProviderKind::SmartId,
        }
    }

    /// Returns the personal code.
    #[must_use]
    pub fn personal_code(&self) -> &str {
        match self {
            Self::MobileId { personal_code, .. } | Self::SmartId { personal_code, .. } => {
                personal_code
            }
        }
    }

    /// Validates the identity hint.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRequest` if the personal code is empty or
    /// not all digits, the phone number is not `+` followed by digits, or the
    /// country is not two ASCII letters.
    pub fn validate(&self) -> AuthResult<()> {
        let personal_code = self.personal_code();
        if personal_code.is_empty() || !personal_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AuthError::invalid_request(
                "personalCode must be a non-empty string of digits",
            ));
        }

        match self {
            Self::MobileId { phone_number, .. } => {
                let digits = phone_number.strip_prefix('+').unwrap_or_default();
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(AuthError::invalid_request(
                        "phoneNumber must be '+' followed by digits",
                    ));
                }
            }
            Self::SmartId { country, .. } => {
                if country.len() != 2 || !country.bytes().all(|b| b.is_ascii_alphabetic()) {
                    return Err(AuthError::invalid_request(
                        "country must be a two letter country code",
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Ceremony and Status
// ============================================================================

/// A started remote ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ceremony {
    /// Provider session id.
    pub session_id: String,
    /// Four digit verification code to show the user.
    pub verification_code: String,
}

/// Provider session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProviderState {
    /// The user has not acted yet.
    Running,
    /// The ceremony ended; see the result code.
    Complete,
}

impl ProviderState {
    /// Returns the wire name of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
        }
    }
}

/// Snapshot returned by a status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    /// Session state.
    pub state: ProviderState,
    /// Result code, present once complete.
    pub result: Option<String>,
    /// Base64 signature over the authentication hash.
    pub signature: Option<String>,
    /// Base64 DER certificate of the signer.
    pub cert: Option<String>,
}

impl ProviderStatus {
    /// A still-running status with no result.
    #[must_use]
    pub fn running() -> Self {
        Self {
            state: ProviderState::Running,
            result: None,
            signature: None,
            cert: None,
        }
    }

    /// A completed status with the given result code.
    #[must_use]
    pub fn complete(result: impl Into<String>) -> Self {
        Self {
            state: ProviderState::Complete,
            result: Some(result.into()),
            signature: None,
            cert: None,
        }
    }

    /// Attaches a certificate.
    #[must_use]
    pub fn with_cert(mut self, cert: impl Into<String>) -> Self {
        self.cert = Some(cert.into());
        self
    }

    /// Attaches a signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Returns `true` once the provider reports a final state.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == ProviderState::Complete
    }

    /// Converts the snapshot into the session diagnostic payload.
    #[must_use]
    pub fn to_payload(&self) -> SessionPayload {
        SessionPayload {
            state: Some(self.state.as_str().to_string()),
            result: self.result.clone(),
            signature: self.signature.clone(),
            cert: self.cert.clone(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by provider clients.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request could not be sent or the response not received.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success HTTP status.
    #[error("Unexpected HTTP status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The provider does not know the session.
    #[error("Provider session not found: {0}")]
    SessionNotFound(String),

    /// The request does not target this provider.
    #[error("Unsupported request for {0}")]
    UnsupportedRequest(ProviderKind),
}

impl ProviderError {
    /// Machine-readable code stored as the session error.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR".to_string(),
            Self::Status { status, .. } => format!("HTTP_{status}"),
            Self::MalformedResponse(_) => "MALFORMED_RESPONSE".to_string(),
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND".to_string(),
            Self::UnsupportedRequest(_) => "UNSUPPORTED_REQUEST".to_string(),
        }
    }

    /// Maps a failed ceremony start into an `AuthError`.
    #[must_use]
    pub fn into_auth_error(self, kind: ProviderKind) -> AuthError {
        AuthError::identity_provider(kind.as_str(), self.to_string())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Reads a response, turning non-success statuses into `ProviderError::Status`.
pub(crate) async fn expect_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Joins a base URL and a path without doubling the slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Capability interface of an identity provider.
///
/// # Implementations
///
/// - [`SmartIdClient`]
/// - [`MobileIdClient`]
///
/// Tests substitute scripted providers.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the provider variant.
    fn kind(&self) -> ProviderKind;

    /// Starts a ceremony for the given identity hint.
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` if the request is for another provider, the
    /// provider cannot be reached, or it rejects the request.
    async fn start(&self, request: &StartRequest) -> Result<Ceremony, ProviderError>;

    /// Checks the state of a provider session, long-polling on the provider
    /// side until it resolves or the poll timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` on transport failures, non-success statuses
    /// and malformed responses. These are not retried by the caller.
    async fn check_status(&self, session_id: &str) -> Result<ProviderStatus, ProviderError>;

    /// Resolves the authenticated identity from a successful status.
    ///
    /// The default reads the signer certificate.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCertificate` if no certificate is present or
    /// it cannot be parsed, and `AuthError::InvalidIdentityNumber` if its
    /// serial number is not a `PNO` identity.
    fn resolve_identity(&self, status: &ProviderStatus) -> AuthResult<Identity> {
        let cert = status
            .cert
            .as_deref()
            .ok_or_else(|| AuthError::invalid_certificate("provider returned no certificate"))?;
        extract_identity(cert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mobile(code: &str, phone: &str) -> StartRequest {
        StartRequest::MobileId {
            personal_code: code.to_string(),
            phone_number: phone.to_string(),
        }
    }

    fn smart(code: &str, country: &str) -> StartRequest {
        StartRequest::SmartId {
            personal_code: code.to_string(),
            country: country.to_string(),
        }
    }

    #[test]
    fn test_valid_requests() {
        assert!(mobile("60001017869", "+37268000769").validate().is_ok());
        assert!(smart("30303039914", "EE").validate().is_ok());
        assert_eq!(mobile("1", "+1").kind(), ProviderKind::MobileId);
        assert_eq!(smart("1", "LV").kind(), ProviderKind::SmartId);
    }

    #[test]
    fn test_invalid_personal_code() {
        for code in ["", "6000x", " 600"] {
            let err = mobile(code, "+37268000769").validate().unwrap_err();
            assert!(matches!(err, AuthError::InvalidRequest { .. }), "{code}");
        }
    }

    #[test]
    fn test_invalid_phone_number() {
        for phone in ["", "+", "37268000769", "+372 6800"] {
            let err = mobile("60001017869", phone).validate().unwrap_err();
            assert!(matches!(err, AuthError::InvalidRequest { .. }), "{phone}");
        }
    }

    #[test]
    fn test_invalid_country() {
        for country in ["", "E", "EST", "E1"] {
            let err = smart("30303039914", country).validate().unwrap_err();
            assert!(matches!(err, AuthError::InvalidRequest { .. }), "{country}");
        }
    }

    #[test]
    fn test_provider_error_codes() {
        assert_eq!(
            ProviderError::Transport("refused".into()).code(),
            "TRANSPORT_ERROR"
        );
        assert_eq!(
            ProviderError::Status {
                status: 500,
                body: String::new()
            }
            .code(),
            "HTTP_500"
        );
        assert_eq!(
            ProviderError::SessionNotFound("x".into()).code(),
            "SESSION_NOT_FOUND"
        );
    }

    #[test]
    fn test_status_payload() {
        let status = ProviderStatus::complete("OK")
            .with_cert("Y2VydA==")
            .with_signature("c2ln");
        let payload = status.to_payload();
        assert_eq!(payload.state.as_deref(), Some("COMPLETE"));
        assert_eq!(payload.result.as_deref(), Some("OK"));
        assert_eq!(payload.cert.as_deref(), Some("Y2VydA=="));
        assert_eq!(payload.signature.as_deref(), Some("c2ln"));
    }

    #[test]
    fn test_endpoint_join() {
        assert_eq!(
            endpoint("https://x.test/api/", "/authentication"),
            "https://x.test/api/authentication"
        );
        assert_eq!(
            endpoint("https://x.test/api", "session/1"),
            "https://x.test/api/session/1"
        );
    }

    struct NoCertProvider;

    #[async_trait]
    impl IdentityProvider for NoCertProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::MobileId
        }

        async fn start(&self, _request: &StartRequest) -> Result<Ceremony, ProviderError> {
            Err(ProviderError::UnsupportedRequest(ProviderKind::MobileId))
        }

        async fn check_status(&self, _session_id: &str) -> Result<ProviderStatus, ProviderError> {
            Ok(ProviderStatus::complete("OK"))
        }
    }

    #[test]
    fn test_default_resolve_identity_requires_cert() {
        let err = NoCertProvider
            .resolve_identity(&ProviderStatus::complete("OK"))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCertificate { .. }));
    }
}
