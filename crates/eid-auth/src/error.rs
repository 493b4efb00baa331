//! Authentication error types.
//!
//! Every fallible operation of the core returns [`AuthError`]. The HTTP layer
//! maps it onto status codes in [`crate::http::error`].

use std::fmt;

/// Errors that can occur while creating, polling or completing an
/// authentication session, or while issuing tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is empty or malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The session does not exist or its TTL has elapsed.
    #[error("Session not found: {session_id}")]
    SessionNotFound {
        /// The session id that was looked up.
        session_id: String,
    },

    /// The session exists but has not resolved successfully.
    #[error("Session not ready: {message}")]
    SessionNotReady {
        /// Why the session cannot be completed.
        message: String,
    },

    /// No user matches the given identifier.
    #[error("User not found: {user}")]
    UserNotFound {
        /// The user id or identity number that was looked up.
        user: String,
    },

    /// The token is empty, malformed, or its signature does not verify.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The certificate cannot be decoded or its common name is malformed.
    #[error("Invalid certificate: {message}")]
    InvalidCertificate {
        /// Description of why the certificate is invalid.
        message: String,
    },

    /// The certificate serial number is not a `PNO<country>-<digits>` identity.
    #[error("Invalid identity number: {value}")]
    InvalidIdentityNumber {
        /// The serial number that failed to match.
        value: String,
    },

    /// The identity provider rejected the request or could not be reached.
    #[error("Identity provider error: {provider} - {message}")]
    IdentityProvider {
        /// The identity provider name.
        provider: String,
        /// Description of the error.
        message: String,
    },

    /// An error occurred while storing or retrieving data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `SessionNotFound` error.
    #[must_use]
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Creates a new `SessionNotReady` error.
    #[must_use]
    pub fn session_not_ready(message: impl Into<String>) -> Self {
        Self::SessionNotReady {
            message: message.into(),
        }
    }

    /// Creates a new `UserNotFound` error.
    #[must_use]
    pub fn user_not_found(user: impl Into<String>) -> Self {
        Self::UserNotFound { user: user.into() }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidCertificate` error.
    #[must_use]
    pub fn invalid_certificate(message: impl Into<String>) -> Self {
        Self::InvalidCertificate {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidIdentityNumber` error.
    #[must_use]
    pub fn invalid_identity_number(value: impl Into<String>) -> Self {
        Self::InvalidIdentityNumber {
            value: value.into(),
        }
    }

    /// Creates a new `IdentityProvider` error.
    #[must_use]
    pub fn identity_provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IdentityProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller sent something unusable (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::SessionNotFound { .. }
                | Self::SessionNotReady { .. }
                | Self::UserNotFound { .. }
                | Self::InvalidToken { .. }
                | Self::TokenExpired
        )
    }

    /// Returns `true` if this is a server-side failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
                | Self::IdentityProvider { .. }
        )
    }

    /// Returns `true` if this is a not-found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound { .. } | Self::UserNotFound { .. }
        )
    }

    /// Returns `true` if this is a token-related error.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(self, Self::InvalidToken { .. } | Self::TokenExpired)
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::SessionNotFound { .. } => ErrorCategory::NotFound,
            Self::SessionNotReady { .. } => ErrorCategory::Session,
            Self::UserNotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::TokenExpired => ErrorCategory::Token,
            Self::InvalidCertificate { .. } => ErrorCategory::Identity,
            Self::InvalidIdentityNumber { .. } => ErrorCategory::Identity,
            Self::IdentityProvider { .. } => ErrorCategory::Provider,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the machine-readable error code for this error.
    ///
    /// The identity variants double as session error codes when the worker
    /// fails to resolve a user from a successful provider response.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            Self::SessionNotReady { .. } => "SESSION_NOT_READY",
            Self::UserNotFound { .. } => "USER_NOT_FOUND",
            Self::InvalidToken { .. } => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidCertificate { .. } => "INVALID_CERTIFICATE",
            Self::InvalidIdentityNumber { .. } => "INVALID_IDENTITY_NUMBER",
            Self::IdentityProvider { .. } => "PROVIDER_ERROR",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// Missing sessions or users.
    NotFound,
    /// Session lifecycle errors.
    Session,
    /// Token validation errors.
    Token,
    /// Certificate and identity extraction errors.
    Identity,
    /// Identity provider errors.
    Provider,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Session => write!(f, "session"),
            Self::Token => write!(f, "token"),
            Self::Identity => write!(f, "identity"),
            Self::Provider => write!(f, "provider"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::session_not_found("abc");
        assert_eq!(err.to_string(), "Session not found: abc");

        let err = AuthError::TokenExpired;
        assert_eq!(err.to_string(), "Token expired");

        let err = AuthError::identity_provider("mobile-id", "connection failed");
        assert_eq!(
            err.to_string(),
            "Identity provider error: mobile-id - connection failed"
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::invalid_request("empty personal code");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert!(!err.is_not_found());

        let err = AuthError::user_not_found("PNOEE-1");
        assert!(err.is_client_error());
        assert!(err.is_not_found());

        let err = AuthError::TokenExpired;
        assert!(err.is_token_error());

        let err = AuthError::storage("redis down");
        assert!(!err.is_client_error());
        assert!(err.is_server_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_request("x").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AuthError::session_not_found("x").category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            AuthError::invalid_certificate("x").category(),
            ErrorCategory::Identity
        );
        assert_eq!(
            AuthError::storage("x").category(),
            ErrorCategory::Infrastructure
        );
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            AuthError::invalid_certificate("x").code(),
            "INVALID_CERTIFICATE"
        );
        assert_eq!(
            AuthError::invalid_identity_number("x").code(),
            "INVALID_IDENTITY_NUMBER"
        );
        assert_eq!(AuthError::TokenExpired.code(), "TOKEN_EXPIRED");
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
    }
}
