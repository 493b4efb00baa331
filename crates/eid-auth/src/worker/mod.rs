//! Session polling worker pool.
//!
//! One [`SessionPoller`] runs per provider. It owns a bounded queue of
//! [`PollTask`]s and a fixed set of workers. Each worker takes one session
//! id at a time and long-polls the provider until the session resolves,
//! then records the outcome in the session store.
//!
//! ```text
//! HTTP create ──enqueue──▶ [ bounded queue ] ──▶ worker 0..N
//!                                                  │ check_status (loop while RUNNING)
//!                                                  ▼
//!                                       SessionStore.update (SUCCESS / ERROR)
//! ```
//!
//! Provider errors end the session with a transport code and are not
//! retried. Unrecognized result codes leave the session `RUNNING` until its
//! TTL expires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::AuthResult;
use crate::error::AuthError;
use crate::provider::{IdentityProvider, ProviderKind, ProviderStatus, ResultCode};
use crate::session::SessionStore;
use crate::storage::UserStorage;
use crate::types::Session;

/// Session error code used when the user record cannot be written.
pub const USER_UPSERT_FAILED: &str = "USER_UPSERT_FAILED";

/// A unit of polling work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTask {
    /// Provider session id.
    pub session_id: String,
    /// Trace id of the request that created the session.
    pub trace_id: String,
}

impl PollTask {
    /// Creates a new task.
    #[must_use]
    pub fn new(session_id: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            trace_id: trace_id.into(),
        }
    }
}

/// Pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Capacity of the task queue.
    pub queue_capacity: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 1000,
        }
    }
}

/// Shared state of the workers.
struct PollContext {
    provider: Arc<dyn IdentityProvider>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStorage>,
    in_flight: DashSet<String>,
}

/// Bounded worker pool that drives sessions of one provider to a terminal
/// state.
pub struct SessionPoller {
    context: Arc<PollContext>,
    config: PollerConfig,
    sender: mpsc::Sender<PollTask>,
    receiver: Arc<Mutex<mpsc::Receiver<PollTask>>>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    started: AtomicBool,
}

impl SessionPoller {
    /// Creates a stopped poller.
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStorage>,
        config: PollerConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            context: Arc::new(PollContext {
                provider,
                sessions,
                users,
                in_flight: DashSet::new(),
            }),
            config,
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Returns the provider this poller serves.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        self.context.provider.kind()
    }

    /// Returns the provider this poller serves.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.context.provider
    }

    /// Launches the workers. Calling it again is a no-op.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::info!(
            provider = %self.kind(),
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            "Session poller started"
        );

        for worker_id in 0..self.config.workers.max(1) {
            let context = Arc::clone(&self.context);
            let receiver = Arc::clone(&self.receiver);
            let cancel = self.cancel.clone();
            self.tracker
                .spawn(run_worker(worker_id, context, receiver, cancel));
        }
    }

    /// Queues a session for polling without waiting for it to be processed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the poller is stopped or the queue is
    /// full.
    pub fn enqueue(&self, task: PollTask) -> AuthResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AuthError::internal("session poller is stopped"));
        }
        if !self.context.in_flight.insert(task.session_id.clone()) {
            tracing::warn!(session_id = %task.session_id, "Session already queued for polling");
            return Ok(());
        }

        let session_id = task.session_id.clone();
        self.sender.try_send(task).map_err(|e| {
            self.context.in_flight.remove(&session_id);
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!(provider = %self.kind(), "Session poll queue is full");
                    AuthError::internal("session poll queue is full")
                }
                mpsc::error::TrySendError::Closed(_) => {
                    AuthError::internal("session poll queue is closed")
                }
            }
        })
    }

    /// Stops accepting work and waits for in-flight sessions to finish.
    ///
    /// Tasks still queued are dropped; their sessions expire by TTL.
    pub async fn stop(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!(provider = %self.kind(), "Session poller stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    context: Arc<PollContext>,
    receiver: Arc<Mutex<mpsc::Receiver<PollTask>>>,
    cancel: CancellationToken,
) {
    loop {
        let task = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            task = async { receiver.lock().await.recv().await } => match task {
                Some(task) => task,
                None => break,
            },
        };

        let span = tracing::info_span!(
            "poll_session",
            provider = %context.provider.kind(),
            session_id = %task.session_id,
            trace_id = %task.trace_id,
            worker_id,
        );
        context.process(&task).instrument(span).await;
        context.in_flight.remove(&task.session_id);
    }
    tracing::debug!(worker_id, "Session poll worker exiting");
}

impl PollContext {
    async fn process(&self, task: &PollTask) {
        let status = loop {
            match self.provider.check_status(&task.session_id).await {
                Ok(status) if status.is_complete() => break status,
                Ok(_) => {
                    tracing::trace!("Provider session still running");
                }
                Err(e) => {
                    tracing::warn!(error = %e, code = %e.code(), "Provider status check failed");
                    self.record(&task.session_id, None, |session| session.fail(e.code()))
                        .await;
                    return;
                }
            }
        };

        let result = status.result.as_deref().unwrap_or_default();
        match ResultCode::parse(result) {
            Some(code) if code.is_success() => self.complete_success(task, &status).await,
            Some(code) => {
                tracing::info!(result = %code, "Authentication failed at provider");
                self.record(&task.session_id, Some(&status), |session| {
                    session.fail(code.as_str())
                })
                .await;
            }
            None => {
                tracing::warn!(
                    result = %result,
                    "Unrecognized provider result code, leaving session running"
                );
            }
        }
    }

    async fn complete_success(&self, task: &PollTask, status: &ProviderStatus) {
        let identity = match self.provider.resolve_identity(status) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve identity from provider response");
                self.record(&task.session_id, Some(status), |session| {
                    session.fail(e.code())
                })
                .await;
                return;
            }
        };

        let user = match self.users.upsert_identity(&identity).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create or update user");
                self.record(&task.session_id, Some(status), |session| {
                    session.fail(USER_UPSERT_FAILED)
                })
                .await;
                return;
            }
        };

        tracing::info!(user_id = %user.id, "Authentication succeeded");
        self.record(&task.session_id, Some(status), |session| {
            session.succeed(user.id)
        })
        .await;
    }

    /// Read-modify-writes the session. Failures are logged, not propagated.
    async fn record<F>(&self, session_id: &str, status: Option<&ProviderStatus>, transition: F)
    where
        F: FnOnce(&mut Session) -> AuthResult<()>,
    {
        let mut session = match self.sessions.find_by_id(session_id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Session disappeared before its outcome was recorded");
                return;
            }
        };

        if let Some(status) = status {
            session.payload = status.to_payload();
        }
        if let Err(e) = transition(&mut session) {
            tracing::warn!(error = %e, "Session transition rejected");
            return;
        }

        match self.sessions.update(&session).await {
            Ok(()) => tracing::debug!(status = %session.status, "Session updated"),
            Err(e) => tracing::error!(error = %e, "Failed to update session"),
        }
    }
}
