//! eid-auth HTTP server.
//!
//! Wires the PostgreSQL storage, the session store, the signing key and the
//! provider worker pools into an axum application.

pub mod config;
pub mod observability;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Json, Router, routing::get};
use eid_auth::http::{AppState, REQUEST_ID_HEADER, router};
use eid_auth::token::{JwtService, SigningKeyPair, TokenConfig};
use eid_auth::{
    AuthenticationService, MemorySessionStore, RedisSessionStore, SessionStore, TokenIssuer,
};
use eid_auth_postgres::PostgresAuthStorage;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, RedisConfig};

/// Creates the session store selected by configuration.
///
/// With Redis disabled sessions live in process memory and a background
/// task purges expired entries every `ttl` until `shutdown` is cancelled.
/// With Redis enabled an unreachable server is an error.
pub async fn create_session_store(
    config: &RedisConfig,
    ttl: Duration,
    shutdown: &CancellationToken,
) -> anyhow::Result<Arc<dyn SessionStore>> {
    if !config.enabled {
        tracing::info!("Redis disabled, using in-memory session store");
        let store = Arc::new(MemorySessionStore::new(ttl));
        store.spawn_purge_task(ttl, shutdown.clone());
        return Ok(store);
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    if let Some(ref mut pool_config) = redis_config.pool {
        pool_config.max_size = config.pool_size;
        pool_config.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
        pool_config.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
        pool_config.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));
    }
    let pool = redis_config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .context("failed to create Redis pool")?;

    let store = RedisSessionStore::new(pool, ttl);
    if !store.is_available().await {
        anyhow::bail!("Redis at {} is unreachable", config.url);
    }
    tracing::info!("Connected to Redis");
    Ok(Arc::new(store))
}

/// Builds the HTTP application around the authentication router.
pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    router(state)
        .route("/healthz", get(healthz))
        // Middleware stack (order: request id -> trace -> body limit)
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let req_id = req
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub struct EidServer {
    addr: SocketAddr,
    app: Router,
    service: Arc<AuthenticationService>,
    shutdown: CancellationToken,
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Connects the stores and assembles the service.
    ///
    /// # Errors
    ///
    /// Fails if PostgreSQL or an enabled Redis is unreachable, migrations
    /// fail, the signing key is invalid, or a provider client cannot be
    /// built.
    pub async fn build(self) -> anyhow::Result<EidServer> {
        let cfg = self.config;

        tracing::info!("Connecting to PostgreSQL");
        let storage = PostgresAuthStorage::connect(&cfg.postgres.url, cfg.postgres.pool_size)
            .await
            .context("failed to connect to PostgreSQL")?;
        if cfg.postgres.run_migrations {
            storage.migrate().await.context("migrations failed")?;
        }

        let shutdown = CancellationToken::new();
        let sessions = create_session_store(&cfg.redis, cfg.auth.session_ttl, &shutdown).await?;

        let signing_key = SigningKeyPair::from_config(&cfg.auth.signing)
            .context("invalid signing configuration")?;
        let jwt = Arc::new(JwtService::new(signing_key, cfg.auth.issuer.clone()));

        let users = Arc::new(storage.users());
        let issuer = Arc::new(TokenIssuer::new(
            jwt,
            users.clone(),
            Arc::new(storage.authorization()),
            Arc::new(storage.tokens()),
            TokenConfig::try_from(&cfg.auth).context("invalid token lifetimes")?,
        ));

        let service = Arc::new(
            AuthenticationService::from_config(&cfg.auth, sessions, users, issuer)
                .context("failed to build identity providers")?,
        );
        tracing::info!(providers = ?service.providers(), "Authentication service ready");

        let app = build_app(&cfg, AppState::new(Arc::clone(&service)));
        Ok(EidServer {
            addr: cfg.addr(),
            app,
            service,
            shutdown,
        })
    }
}

impl EidServer {
    /// Serves until a shutdown signal, then drains the worker pools.
    pub async fn run(self) -> anyhow::Result<()> {
        self.service.start();

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        self.service.shutdown().await;
        self.shutdown.cancel();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
