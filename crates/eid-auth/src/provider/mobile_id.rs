//! Mobile-ID relying party client.
//!
//! - `POST {base}/authentication` starts a ceremony
//! - `GET {base}/authentication/session/{id}?timeoutMs=` long-polls its status

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    AuthenticationHash, Ceremony, HashType, IdentityProvider, ProviderError, ProviderKind,
    ProviderState, ProviderStatus, StartRequest, endpoint, expect_success,
};
use crate::AuthResult;
use crate::config::MobileIdConfig;
use crate::error::AuthError;

/// Slack on top of the provider long-poll before the HTTP client gives up.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticationRequest<'a> {
    #[serde(rename = "relyingPartyUUID")]
    relying_party_uuid: &'a str,
    relying_party_name: &'a str,
    phone_number: &'a str,
    national_identity_number: &'a str,
    hash: String,
    hash_type: &'static str,
    language: &'a str,
    display_text: &'a str,
    display_text_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(rename = "sessionID")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    state: ProviderState,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    signature: Option<SignatureBody>,
    #[serde(default)]
    cert: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignatureBody {
    value: String,
}

/// Mobile-ID REST client.
pub struct MobileIdClient {
    http: reqwest::Client,
    config: MobileIdConfig,
}

impl MobileIdClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: MobileIdConfig) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.poll_timeout + REQUEST_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| {
                AuthError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl IdentityProvider for MobileIdClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MobileId
    }

    async fn start(&self, request: &StartRequest) -> Result<Ceremony, ProviderError> {
        let StartRequest::MobileId {
            personal_code,
            phone_number,
        } = request
        else {
            return Err(ProviderError::UnsupportedRequest(ProviderKind::MobileId));
        };

        let hash = AuthenticationHash::generate(HashType::Sha256);
        let body = AuthenticationRequest {
            relying_party_uuid: &self.config.relying_party_uuid,
            relying_party_name: &self.config.relying_party_name,
            phone_number,
            national_identity_number: personal_code,
            hash: hash.to_base64(),
            hash_type: hash.hash_type().as_str(),
            language: &self.config.language,
            display_text: &self.config.display_text,
            display_text_format: "GSM-7",
        };

        let url = endpoint(&self.config.base_url, "authentication");
        tracing::debug!(url = %url, "Starting Mobile-ID authentication");

        let response = self.http.post(&url).json(&body).send().await?;
        let session: SessionResponse = expect_success(response).await?.json().await?;

        Ok(Ceremony {
            session_id: session.session_id,
            verification_code: hash.mobile_id_verification_code(),
        })
    }

    async fn check_status(&self, session_id: &str) -> Result<ProviderStatus, ProviderError> {
        let url = endpoint(
            &self.config.base_url,
            &format!("authentication/session/{session_id}"),
        );
        let response = self
            .http
            .get(&url)
            .query(&[("timeoutMs", self.config.poll_timeout.as_millis().to_string())])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::SessionNotFound(session_id.to_string()));
        }
        let status: StatusResponse = expect_success(response).await?.json().await?;

        if status.state == ProviderState::Complete && status.result.is_none() {
            return Err(ProviderError::MalformedResponse(
                "complete session without result".to_string(),
            ));
        }

        Ok(ProviderStatus {
            state: status.state,
            result: status.result,
            signature: status.signature.map(|s| s.value),
            cert: status.cert,
        })
    }
}
