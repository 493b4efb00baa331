//! End-to-end authentication flow: orchestrator, worker pool, token issuer
//! and the HTTP router, against scripted providers and in-memory storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::{Engine, engine::general_purpose::STANDARD};
use eid_auth::http::{AppState, router};
use eid_auth::provider::{Ceremony, ProviderError, ProviderKind, ProviderStatus};
use eid_auth::storage::{AuthorizationResolver, TokenStorage, UserStorage};
use eid_auth::token::{AccessClaims, JwtService, SigningKeyPair, TokenConfig};
use eid_auth::worker::PollerConfig;
use eid_auth::{
    AuthError, AuthResult, AuthenticationService, IdentityProvider, MemorySessionStore, Session,
    SessionStatus, StartRequest, Token, TokenIssuer, User,
};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// Scripted provider
// ============================================================================

/// Reports RUNNING until an outcome is set, then reports the outcome.
struct ScriptedProvider {
    kind: ProviderKind,
    session_id: RwLock<String>,
    outcome: RwLock<Option<Result<ProviderStatus, u16>>>,
    polls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(kind: ProviderKind, session_id: &str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            session_id: RwLock::new(session_id.to_string()),
            outcome: RwLock::new(None),
            polls: AtomicUsize::new(0),
        })
    }

    fn next_session(&self, session_id: &str) {
        *self.session_id.write().unwrap() = session_id.to_string();
    }

    async fn wait_polled(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.polls.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("session was never polled");
    }

    fn resolve(&self, status: ProviderStatus) {
        *self.outcome.write().unwrap() = Some(Ok(status));
    }

    fn fail_transport(&self, http_status: u16) {
        *self.outcome.write().unwrap() = Some(Err(http_status));
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn start(&self, _request: &StartRequest) -> Result<Ceremony, ProviderError> {
        Ok(Ceremony {
            session_id: self.session_id.read().unwrap().clone(),
            verification_code: "1234".to_string(),
        })
    }

    async fn check_status(&self, _session_id: &str) -> Result<ProviderStatus, ProviderError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.read().unwrap().clone();
        match outcome {
            Some(Ok(status)) => Ok(status),
            Some(Err(status)) => Err(ProviderError::Status {
                status,
                body: String::new(),
            }),
            None => {
                // stands in for the provider's long-poll wait
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(ProviderStatus::running())
            }
        }
    }
}

// ============================================================================
// In-memory storage
// ============================================================================

#[derive(Default)]
struct MemoryUsers {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStorage for MemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users.read().unwrap().get(&id).cloned())
    }

    async fn find_by_identity_number(&self, identity_number: &str) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.identity_number == identity_number)
            .cloned())
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        self.users.write().unwrap().insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        self.users.write().unwrap().insert(user.id, user.clone());
        Ok(())
    }
}

struct StaticGrants;

#[async_trait]
impl AuthorizationResolver for StaticGrants {
    async fn roles(&self, _user_id: Uuid) -> AuthResult<Vec<String>> {
        Ok(vec!["citizen".to_string()])
    }

    async fn permissions(&self, _user_id: Uuid) -> AuthResult<Vec<String>> {
        Ok(vec!["documents.read".to_string()])
    }

    async fn scopes(&self, _user_id: Uuid) -> AuthResult<Vec<String>> {
        Ok(vec!["openid".to_string()])
    }
}

#[derive(Default)]
struct RecordingTokens {
    pairs: RwLock<Vec<(String, String)>>,
}

#[async_trait]
impl TokenStorage for RecordingTokens {
    async fn store_pair(&self, access: &Token, refresh: &Token) -> AuthResult<()> {
        self.pairs
            .write()
            .unwrap()
            .push((access.fingerprint(), refresh.fingerprint()));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    service: Arc<AuthenticationService>,
    provider: Arc<ScriptedProvider>,
    users: Arc<MemoryUsers>,
    tokens: Arc<RecordingTokens>,
}

impl Harness {
    fn new(session_id: &str) -> Self {
        let provider = ScriptedProvider::new(ProviderKind::MobileId, session_id);
        let sessions = Arc::new(MemorySessionStore::new(Duration::from_secs(300)));
        let users = Arc::new(MemoryUsers::default());
        let tokens = Arc::new(RecordingTokens::default());
        let jwt = Arc::new(JwtService::new(
            SigningKeyPair::from_secret(b"integration-secret"),
            "https://auth.test",
        ));
        let issuer = Arc::new(TokenIssuer::new(
            jwt,
            users.clone(),
            Arc::new(StaticGrants),
            tokens.clone(),
            TokenConfig::default(),
        ));
        let service = AuthenticationService::new(sessions, users.clone(), issuer)
            .with_provider(
                provider.clone(),
                PollerConfig {
                    workers: 2,
                    queue_capacity: 16,
                },
            );
        service.start();

        Self {
            service: Arc::new(service),
            provider,
            users,
            tokens,
        }
    }

    async fn wait_terminal(&self, id: &str) -> Session {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let session = self.service.get_status(id).await.unwrap();
                if session.is_terminal() {
                    return session;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session did not resolve")
    }
}

fn mobile_id_request() -> StartRequest {
    StartRequest::MobileId {
        personal_code: "60001017869".to_string(),
        phone_number: "+37268000769".to_string(),
    }
}

fn certificate(common_name: &str, serial: &str) -> String {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::CustomDnType(vec![2, 5, 4, 5]), serial);
    params.distinguished_name = dn;
    let key = KeyPair::generate().unwrap();
    STANDARD.encode(params.self_signed(&key).unwrap().der())
}

fn success_status() -> ProviderStatus {
    ProviderStatus::complete("OK")
        .with_cert(certificate("Mary,Änn", "PNOEE-60001017869"))
        .with_signature("c2lnbmF0dXJl")
}

// ============================================================================
// Orchestrator scenarios
// ============================================================================

#[tokio::test]
async fn test_successful_authentication() {
    let h = Harness::new("X");

    let created = h
        .service
        .create_session(mobile_id_request(), "trace-1")
        .await
        .unwrap();
    assert_eq!(created.id, "X");
    assert_eq!(created.code, "1234");

    let session = h.service.get_status("X").await.unwrap();
    assert_eq!(session.status, SessionStatus::Running);
    assert!(session.user_id.is_none());

    h.provider.resolve(success_status());
    let session = h.wait_terminal("X").await;
    assert_eq!(session.status, SessionStatus::Success);
    let user_id = session.user_id.unwrap();
    assert_eq!(session.payload.result.as_deref(), Some("OK"));

    // never reverts
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        h.service.get_status("X").await.unwrap().status,
        SessionStatus::Success
    );

    let completed = h.service.complete("X").await.unwrap();
    assert_eq!(completed.user.id, user_id);
    assert_eq!(completed.user.identity_number, "PNOEE-60001017869");
    assert_eq!(completed.user.personal_code, "60001017869");
    assert_eq!(completed.user.first_name, "Mary");
    assert_eq!(completed.user.last_name, "Änn");
    assert!(!completed.tokens.access.value.is_empty());
    assert!(!completed.tokens.refresh.value.is_empty());
    assert_eq!(h.tokens.pairs.read().unwrap().len(), 1);

    let claims = h
        .service
        .jwt_service()
        .decode::<AccessClaims>(&completed.tokens.access.value)
        .unwrap()
        .claims;
    assert_eq!(claims.sub, "PNOEE-60001017869");
    assert_eq!(claims.roles, vec!["citizen"]);
    assert_eq!(claims.permissions, vec!["documents.read"]);
    assert_eq!(claims.scopes, vec!["openid"]);

    let err = h.service.get_status("X").await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound { .. }));
    let err = h.service.complete("X").await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound { .. }));

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_provider_timeout() {
    let h = Harness::new("X");
    h.service
        .create_session(mobile_id_request(), "trace-2")
        .await
        .unwrap();

    h.provider.resolve(ProviderStatus::complete("TIMEOUT"));
    let session = h.wait_terminal("X").await;
    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.error.as_deref(), Some("TIMEOUT"));

    let err = h.service.complete("X").await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotReady { .. }));
    assert!(h.tokens.pairs.read().unwrap().is_empty());
    assert!(h.service.get_status("X").await.is_ok());

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_transport_error_terminates_session() {
    let h = Harness::new("X");
    h.service
        .create_session(mobile_id_request(), "trace-3")
        .await
        .unwrap();

    h.provider.fail_transport(503);
    let session = h.wait_terminal("X").await;
    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.error.as_deref(), Some("HTTP_503"));

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_complete_while_running_changes_nothing() {
    let h = Harness::new("X");
    h.service
        .create_session(mobile_id_request(), "trace-4")
        .await
        .unwrap();

    let err = h.service.complete("X").await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotReady { .. }));
    assert!(h.tokens.pairs.read().unwrap().is_empty());
    assert_eq!(
        h.service.get_status("X").await.unwrap().status,
        SessionStatus::Running
    );

    h.provider.resolve(ProviderStatus::complete("USER_CANCELLED"));
    h.wait_terminal("X").await;
    h.service.shutdown().await;
}

#[tokio::test]
async fn test_repeat_login_updates_existing_user() {
    let h = Harness::new("X1");

    h.service
        .create_session(mobile_id_request(), "t")
        .await
        .unwrap();
    h.provider.resolve(success_status());
    let first = h.wait_terminal("X1").await.user_id.unwrap();
    h.service.complete("X1").await.unwrap();

    h.provider.next_session("X2");
    h.provider.resolve(
        ProviderStatus::complete("OK").with_cert(certificate("Mary,Smith", "PNOEE-60001017869")),
    );
    h.service
        .create_session(mobile_id_request(), "t")
        .await
        .unwrap();
    let second = h.wait_terminal("X2").await.user_id.unwrap();

    assert_eq!(first, second);
    let users = h.users.users.read().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[&first].last_name, "Smith");
    drop(users);

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_refresh_round_trip() {
    let h = Harness::new("X");
    h.service
        .create_session(mobile_id_request(), "t")
        .await
        .unwrap();
    h.provider.resolve(success_status());
    h.wait_terminal("X").await;
    let completed = h.service.complete("X").await.unwrap();

    let refreshed = h
        .service
        .refresh(&completed.tokens.refresh.value)
        .await
        .unwrap();
    assert_eq!(refreshed.user.id, completed.user.id);
    assert_ne!(refreshed.tokens.access.value, completed.tokens.access.value);

    let jwt = h.service.jwt_service();
    let before = jwt
        .decode::<AccessClaims>(&completed.tokens.access.value)
        .unwrap()
        .claims;
    let after = jwt
        .decode::<AccessClaims>(&refreshed.tokens.access.value)
        .unwrap()
        .claims;
    assert_eq!(before.sub, after.sub);

    let err = h.service.refresh("").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken { .. }));
    let err = h.service.refresh("not.a.jwt").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken { .. }));
    // access tokens are not refresh tokens
    let err = h
        .service
        .refresh(&completed.tokens.access.value)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken { .. }));

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_sessions() {
    let h = Harness::new("X");
    h.service
        .create_session(mobile_id_request(), "t")
        .await
        .unwrap();
    h.provider.wait_polled().await;

    let provider = h.provider.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        provider.resolve(ProviderStatus::complete("USER_CANCELLED"));
    });

    h.service.shutdown().await;
    let session = h.service.get_status("X").await.unwrap();
    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.error.as_deref(), Some("USER_CANCELLED"));

    let err = h
        .service
        .create_session(mobile_id_request(), "t")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Internal { .. }));
}

// ============================================================================
// HTTP
// ============================================================================

async fn send(
    app: &axum::Router,
    request: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .header("x-request-id", "http-trace")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_http_flow() {
    let h = Harness::new("X");
    let app = router(AppState::new(h.service.clone()));

    let (status, body) = send(
        &app,
        json_post(
            "/auth/mobile-id",
            r#"{"personalCode":"60001017869","phoneNumber":"+37268000769"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, serde_json::json!({"id": "X", "code": "1234"}));

    let (status, body) = send(
        &app,
        Request::get("/auth/sessions/X").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"id": "X", "status": "RUNNING"}));

    let (status, body) = send(
        &app,
        Request::get("/auth/sessions/X/complete")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "SESSION_NOT_READY");

    h.provider.resolve(success_status());
    h.wait_terminal("X").await;

    let (status, body) = send(
        &app,
        Request::post("/auth/sessions/X/complete")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["identityNumber"], "PNOEE-60001017869");
    assert_eq!(body["personalCode"], "60001017869");
    assert_eq!(body["firstName"], "Mary");
    assert_eq!(body["lastName"], "Änn");
    let refresh_token = body["refreshToken"].as_str().unwrap().to_string();
    assert!(!body["accessToken"].as_str().unwrap().is_empty());

    let (status, _) = send(
        &app,
        Request::get("/auth/sessions/X").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        json_post(
            "/auth/token/refresh",
            &serde_json::json!({ "refreshToken": refresh_token }).to_string(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["accessToken"].as_str().unwrap().is_empty());
    assert!(!body["refreshToken"].as_str().unwrap().is_empty());

    let (status, body) = send(&app, json_post("/auth/token/refresh", r#"{"refreshToken":""}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");

    let (status, body) = send(
        &app,
        json_post("/auth/token/refresh", r#"{"refreshToken":"garbage"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "INVALID_TOKEN");

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_http_validation_errors() {
    let h = Harness::new("X");
    let app = router(AppState::new(h.service.clone()));

    let (status, body) = send(
        &app,
        json_post("/auth/mobile-id", r#"{"personalCode":"","phoneNumber":"+372"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");

    let (status, _) = send(&app, json_post("/auth/mobile-id", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_post(
            "/auth/mobile-id",
            r#"{"personalCode":"60001017869","phoneNumber":"37268000769"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    h.service.shutdown().await;
}

#[tokio::test]
async fn test_http_jwks_is_empty_for_hmac() {
    let h = Harness::new("X");
    let app = router(AppState::new(h.service.clone()));

    let (status, body) = send(
        &app,
        Request::get("/.well-known/jwks.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"keys": []}));

    h.service.shutdown().await;
}
