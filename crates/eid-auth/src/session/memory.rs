//! In-memory session store.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use super::SessionStore;
use crate::AuthResult;
use crate::error::AuthError;
use crate::types::Session;

struct Entry {
    session: Session,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Session store backed by a `DashMap` with per-entry expiry.
///
/// Expired entries are dropped on lookup and by the purge task started with
/// [`MemorySessionStore::spawn_purge_task`]. Sessions are lost on restart and
/// are not shared between instances.
pub struct MemorySessionStore {
    sessions: DashMap<String, Entry>,
    ttl: Duration,
}

impl MemorySessionStore {
    /// Creates a new store with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Returns the number of stored (possibly expired) sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes all expired entries and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.sessions.len())
    }

    /// Spawns a task that calls [`Self::purge_expired`] every `every`.
    ///
    /// The task ends when `shutdown` is cancelled or the store is dropped.
    pub fn spawn_purge_task(
        self: &Arc<Self>,
        every: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        let every = every.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(store) = store.upgrade() else { break };
                        let removed = store.purge_expired();
                        if removed > 0 {
                            tracing::debug!(removed, "Purged expired sessions");
                        }
                    }
                }
            }
            tracing::debug!("Session purge task stopped");
        })
    }

    fn put(&self, session: &Session) {
        self.sessions.insert(
            session.id.clone(),
            Entry {
                session: session.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        self.put(session);
        Ok(())
    }

    async fn update(&self, session: &Session) -> AuthResult<()> {
        self.put(session);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AuthResult<Session> {
        if let Some(entry) = self.sessions.get(id)
            && !entry.is_expired()
        {
            return Ok(entry.session.clone());
        }
        // Re-checked under the shard lock so a concurrent write survives.
        self.sessions.remove_if(id, |_, entry| entry.is_expired());
        Err(AuthError::session_not_found(id))
    }

    async fn take(&self, id: &str) -> AuthResult<Option<Session>> {
        Ok(self
            .sessions
            .remove(id)
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(_, entry)| entry.session))
    }

    async fn delete(&self, id: &str) -> AuthResult<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
