//! Authentication session record.
//!
//! A session is created `RUNNING`, moved to `SUCCESS` or `ERROR` exactly once
//! by the polling worker that owns it, and deleted once the caller has
//! consumed the result.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;

/// Coarse session status, independent of the provider's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    /// Waiting for the provider to resolve the attempt.
    Running,
    /// The user authenticated and `user_id` is set.
    Success,
    /// The attempt failed; `error` carries the reason.
    Error,
}

impl SessionStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }

    /// Returns `true` for `SUCCESS` and `ERROR`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last raw provider snapshot, retained for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// Provider state (`RUNNING` / `COMPLETE`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Provider result code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Base64 signature over the authentication hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Base64 DER certificate of the signer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
}

/// One authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Provider session id.
    pub id: String,

    /// Resolved user, set only on success.
    #[serde(default)]
    pub user_id: Option<Uuid>,

    /// Four digit verification code shown to the user.
    pub code: String,

    /// Current status.
    pub status: SessionStatus,

    /// Machine-readable failure code, set only on error.
    #[serde(default)]
    pub error: Option<String>,

    /// Last provider snapshot.
    #[serde(default)]
    pub payload: SessionPayload,
}

impl Session {
    /// Creates a new `RUNNING` session.
    #[must_use]
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: None,
            code: code.into(),
            status: SessionStatus::Running,
            error: None,
            payload: SessionPayload::default(),
        }
    }

    /// Returns `true` if the session has left `RUNNING`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transitions a running session to `SUCCESS`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the session is already terminal.
    pub fn succeed(&mut self, user_id: Uuid) -> AuthResult<()> {
        self.ensure_running()?;
        self.status = SessionStatus::Success;
        self.user_id = Some(user_id);
        self.error = None;
        Ok(())
    }

    /// Transitions a running session to `ERROR` with the given code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the session is already terminal.
    pub fn fail(&mut self, code: impl Into<String>) -> AuthResult<()> {
        self.ensure_running()?;
        self.status = SessionStatus::Error;
        self.user_id = None;
        self.error = Some(code.into());
        Ok(())
    }

    fn ensure_running(&self) -> AuthResult<()> {
        if self.is_terminal() {
            return Err(AuthError::internal(format!(
                "session {} is already {}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}
