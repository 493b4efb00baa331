//! Smart-ID relying party client.
//!
//! - `POST {base}/authentication/etsi/PNO{country}-{code}` starts a ceremony
//! - `GET {base}/session/{id}?timeoutMs=` long-polls its status

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    AuthenticationHash, Ceremony, HashType, IdentityProvider, ProviderError, ProviderKind,
    ProviderState, ProviderStatus, StartRequest, endpoint, expect_success,
};
use crate::AuthResult;
use crate::config::SmartIdConfig;
use crate::error::AuthError;

/// Slack on top of the provider long-poll before the HTTP client gives up.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticationRequest<'a> {
    #[serde(rename = "relyingPartyUUID")]
    relying_party_uuid: &'a str,
    relying_party_name: &'a str,
    certificate_level: &'a str,
    hash: String,
    hash_type: &'static str,
    allowed_interactions_order: Vec<Interaction<'a>>,
}

#[derive(Debug, Serialize)]
struct Interaction<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "displayText60")]
    display_text: &'a str,
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
    result: Option<StatusResult>,
    #[serde(default)]
    signature: Option<SignatureBody>,
    #[serde(default)]
    cert: Option<CertBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResult {
    end_result: String,
}

#[derive(Debug, Deserialize)]
struct SignatureBody {
    value: String,
}

#[derive(Debug, Deserialize)]
struct CertBody {
    value: String,
}

/// Smart-ID REST client.
pub struct SmartIdClient {
    http: reqwest::Client,
    config: SmartIdConfig,
}

impl SmartIdClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: SmartIdConfig) -> AuthResult<Self> {
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
impl IdentityProvider for SmartIdClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SmartId
    }

    async fn start(&self, request: &StartRequest) -> Result<Ceremony, ProviderError> {
        let StartRequest::SmartId {
            personal_code,
            country,
        } = request
        else {
            return Err(ProviderError::UnsupportedRequest(ProviderKind::SmartId));
        };

        let hash = AuthenticationHash::generate(HashType::Sha512);
        let body = AuthenticationRequest {
            relying_party_uuid: &self.config.relying_party_uuid,
            relying_party_name: &self.config.relying_party_name,
            certificate_level: &self.config.certificate_level,
            hash: hash.to_base64(),
            hash_type: hash.hash_type().as_str(),
            allowed_interactions_order: vec![Interaction {
                kind: "displayTextAndPIN",
                display_text: &self.config.display_text,
            }],
        };

        let url = endpoint(
            &self.config.base_url,
            &format!(
                "authentication/etsi/PNO{}-{}",
                country.to_ascii_uppercase(),
                personal_code
            ),
        );
        tracing::debug!(url = %url, "Starting Smart-ID authentication");

        let response = self.http.post(&url).json(&body).send().await?;
        let session: SessionResponse = expect_success(response).await?.json().await?;

        Ok(Ceremony {
            session_id: session.session_id,
            verification_code: hash.smart_id_verification_code(),
        })
    }

    async fn check_status(&self, session_id: &str) -> Result<ProviderStatus, ProviderError> {
        let url = endpoint(&self.config.base_url, &format!("session/{session_id}"));
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
            result: status.result.map(|r| r.end_result),
            signature: status.signature.map(|s| s.value),
            cert: status.cert.map(|c| c.value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> SmartIdClient {
        SmartIdClient::new(SmartIdConfig {
            base_url: base_url.to_string(),
            poll_timeout: Duration::from_secs(5),
            ..SmartIdConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/etsi/PNOEE-30303039914"))
            .and(body_partial_json(json!({
                "relyingPartyUUID": "00000000-0000-0000-0000-000000000000",
                "relyingPartyName": "DEMO",
                "certificateLevel": "QUALIFIED",
                "hashType": "SHA512",
                "allowedInteractionsOrder": [
                    {"type": "displayTextAndPIN", "displayText60": "Log in"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sessionID": "de305d54-75b4-431b-adb2-eb6b9e546014"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = StartRequest::SmartId {
            personal_code: "30303039914".to_string(),
            country: "ee".to_string(),
        };
        let ceremony = client(&server.uri()).start(&request).await.unwrap();
        assert_eq!(ceremony.session_id, "de305d54-75b4-431b-adb2-eb6b9e546014");
        assert_eq!(ceremony.verification_code.len(), 4);
    }

    #[tokio::test]
    async fn test_start_rejects_mobile_id_request() {
        let request = StartRequest::MobileId {
            personal_code: "1".to_string(),
            phone_number: "+1".to_string(),
        };
        let err = client("http://127.0.0.1:1").start(&request).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::UnsupportedRequest(ProviderKind::SmartId)
        ));
    }

    #[tokio::test]
    async fn test_start_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(471))
            .mount(&server)
            .await;

        let request = StartRequest::SmartId {
            personal_code: "30303039914".to_string(),
            country: "EE".to_string(),
        };
        let err = client(&server.uri()).start(&request).await.unwrap_err();
        assert_eq!(err.code(), "HTTP_471");
    }

    #[tokio::test]
    async fn test_status_complete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/session/abc"))
            .and(query_param("timeoutMs", "5000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "COMPLETE",
                "result": {"endResult": "OK", "documentNumber": "PNOEE-30303039914-MOCK-Q"},
                "signature": {"value": "c2ln", "algorithm": "sha512WithRSAEncryption"},
                "cert": {"value": "Y2VydA==", "certificateLevel": "QUALIFIED"}
            })))
            .mount(&server)
            .await;

        let status = client(&server.uri()).check_status("abc").await.unwrap();
        assert!(status.is_complete());
        assert_eq!(status.result.as_deref(), Some("OK"));
        assert_eq!(status.signature.as_deref(), Some("c2ln"));
        assert_eq!(status.cert.as_deref(), Some("Y2VydA=="));
    }

    #[tokio::test]
    async fn test_status_running() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/session/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "RUNNING"})))
            .mount(&server)
            .await;

        let status = client(&server.uri()).check_status("abc").await.unwrap();
        assert_eq!(status, ProviderStatus::running());
    }

    #[tokio::test]
    async fn test_status_refused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/session/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "COMPLETE",
                "result": {"endResult": "USER_REFUSED"}
            })))
            .mount(&server)
            .await;

        let status = client(&server.uri()).check_status("abc").await.unwrap();
        assert_eq!(status.result.as_deref(), Some("USER_REFUSED"));
        assert!(status.cert.is_none());
    }

    #[tokio::test]
    async fn test_status_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server.uri()).check_status("gone").await.unwrap_err();
        assert_eq!(err.code(), "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_status_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server.uri()).check_status("abc").await.unwrap_err();
        assert_eq!(err.code(), "MALFORMED_RESPONSE");
    }

    #[tokio::test]
    async fn test_status_transport_error() {
        let err = client("http://127.0.0.1:1")
            .check_status("abc")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TRANSPORT_ERROR");
    }
}
