//! The session store: lifecycle rules over a pluggable backend.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use haven_types::{Session, SessionId, SessionState, TransitionTrigger};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::backend::{MemoryBackend, SessionBackend};
use crate::error::{Result, SessionError};

/// Limits applied to newly created sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub max_messages: u32,
    pub timeout_minutes: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_messages: 50,
            timeout_minutes: 30,
        }
    }
}

/// Result of checking a session against lifecycle rules.
///
/// An invalid session is not an error — callers answer with a degraded
/// response and leave state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionValidity {
    Valid,
    Expired,
    MessageLimit,
    Closed,
}

impl SessionValidity {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionValidity::Valid)
    }

    /// Trigger to record when the sweep closes a session for this reason.
    pub fn close_trigger(&self) -> Option<TransitionTrigger> {
        match self {
            SessionValidity::Expired => Some(TransitionTrigger::Expired),
            SessionValidity::MessageLimit => Some(TransitionTrigger::MessageLimit),
            SessionValidity::Valid | SessionValidity::Closed => None,
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: usize,
    pub active: usize,
    pub closed: usize,
}

/// Key-value store of sessions with per-session write exclusion.
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
    config: StoreConfig,
}

impl SessionStore {
    pub fn with_backend(backend: Arc<dyn SessionBackend>, config: StoreConfig) -> Self {
        Self {
            backend,
            locks: DashMap::new(),
            config,
        }
    }

    /// Store over the default in-memory backend.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()), config)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The write lock for one session id.
    ///
    /// All writers for a session — message processing and the expiry sweep —
    /// must hold this before mutating.
    pub fn session_lock(&self, id: &SessionId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Create a session in `Init`.
    pub async fn create(&self, user_id: Option<String>) -> Result<Session> {
        let session = Session::new(
            user_id,
            self.config.max_messages,
            self.config.timeout_minutes,
        );
        self.backend.put(&session).await?;
        info!(session_id = %session.id, "session created");
        Ok(session)
    }

    /// Fetch a session; unknown ids are a distinct error kind.
    pub async fn get(&self, id: &SessionId) -> Result<Session> {
        self.backend
            .get(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Persist a mutated session.
    ///
    /// A session already closed in storage accepts no update through this
    /// path — audit metadata goes through [`SessionStore::audit_note`].
    pub async fn update(&self, session: &Session) -> Result<()> {
        if let Some(stored) = self.backend.get(&session.id).await? {
            if stored.is_closed() {
                return Err(SessionError::Closed(session.id.clone()));
            }
        }
        self.backend.put(session).await
    }

    /// Refresh a session's activity timestamp.
    pub async fn touch(&self, id: &SessionId) -> Result<()> {
        let mut session = self.get(id).await?;
        if session.is_closed() {
            return Err(SessionError::Closed(id.clone()));
        }
        session.touch();
        self.backend.put(&session).await
    }

    /// Attach audit metadata, the one mutation allowed after close.
    pub async fn audit_note(
        &self,
        id: &SessionId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<()> {
        let mut session = self.get(id).await?;
        session.audit_note(key, value);
        self.backend.put(&session).await
    }

    /// Close a session. Idempotent: closing a closed session is a no-op.
    pub async fn close(
        &self,
        id: &SessionId,
        trigger: TransitionTrigger,
        reason: &str,
    ) -> Result<Session> {
        let mut session = self.get(id).await?;
        if session.is_closed() {
            debug!(session_id = %id, "close requested for already-closed session");
            return Ok(session);
        }

        session.record_transition(SessionState::Close, trigger);
        session.audit_note("close_reason", serde_json::json!(reason));
        self.backend.put(&session).await?;
        info!(session_id = %id, reason = reason, "session closed");
        Ok(session)
    }

    /// Remove a session entirely (explicit delete or retention eviction).
    pub async fn delete(&self, id: &SessionId) -> Result<()> {
        self.backend.remove(id).await?;
        self.locks.remove(id);
        debug!(session_id = %id, "session deleted");
        Ok(())
    }

    /// Lifecycle check: expired, over the message limit, or closed.
    pub fn validate(&self, session: &Session) -> SessionValidity {
        if Utc::now() > session.expires_at {
            return SessionValidity::Expired;
        }
        if session.message_count >= session.max_messages {
            return SessionValidity::MessageLimit;
        }
        if session.is_closed() {
            return SessionValidity::Closed;
        }
        SessionValidity::Valid
    }

    pub async fn list(&self) -> Result<Vec<Session>> {
        self.backend.list().await
    }

    pub async fn list_active(&self) -> Result<Vec<Session>> {
        Ok(self
            .backend
            .list()
            .await?
            .into_iter()
            .filter(|s| !s.is_closed())
            .collect())
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let sessions = self.backend.list().await?;
        let closed = sessions.iter().filter(|s| s.is_closed()).count();
        Ok(StoreStats {
            total: sessions.len(),
            active: sessions.len() - closed,
            closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::in_memory(StoreConfig::default())
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = store();
        let session = store.create(Some("user-1".into())).await.unwrap();
        let loaded = store.get(&session.id).await.unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.user_id.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = store();
        let err = store.get(&SessionId::generate()).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let store = store();
        let session = store.create(None).await.unwrap();

        let closed = store
            .close(&session.id, TransitionTrigger::CloseRequested, "user asked")
            .await
            .unwrap();
        assert!(closed.is_closed());
        assert_eq!(closed.transitions.len(), 1);

        let again = store
            .close(&session.id, TransitionTrigger::SystemClose, "shutdown")
            .await
            .unwrap();
        // No second transition recorded.
        assert_eq!(again.transitions.len(), 1);
    }

    #[tokio::test]
    async fn closed_session_rejects_updates_but_takes_audit_notes() {
        let store = store();
        let session = store.create(None).await.unwrap();
        store
            .close(&session.id, TransitionTrigger::CloseRequested, "done")
            .await
            .unwrap();

        let mut stale = session.clone();
        stale.message_count = 10;
        assert!(matches!(
            store.update(&stale).await,
            Err(SessionError::Closed(_))
        ));

        store
            .audit_note(&session.id, "follow_up", serde_json::json!("reviewed"))
            .await
            .unwrap();
        let loaded = store.get(&session.id).await.unwrap();
        assert_eq!(loaded.metadata["follow_up"], serde_json::json!("reviewed"));
        assert!(loaded.is_closed());
    }

    #[tokio::test]
    async fn touch_refreshes_activity() {
        let store = store();
        let session = store.create(None).await.unwrap();
        let before = store.get(&session.id).await.unwrap().updated_at;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.touch(&session.id).await.unwrap();

        let after = store.get(&session.id).await.unwrap().updated_at;
        assert!(after > before);
    }

    #[tokio::test]
    async fn validate_flags_expired_and_limit() {
        let store = store();
        let mut session = store.create(None).await.unwrap();
        assert!(store.validate(&session).is_valid());

        session.message_count = session.max_messages;
        assert_eq!(store.validate(&session), SessionValidity::MessageLimit);

        session.message_count = 0;
        session.expires_at = Utc::now() - chrono::Duration::minutes(1);
        assert_eq!(store.validate(&session), SessionValidity::Expired);
    }

    #[tokio::test]
    async fn session_lock_is_shared_per_id() {
        let store = store();
        let session = store.create(None).await.unwrap();
        let a = store.session_lock(&session.id);
        let b = store.session_lock(&session.id);
        assert!(Arc::ptr_eq(&a, &b));

        let other = store.session_lock(&SessionId::generate());
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test]
    async fn stats_split_active_and_closed() {
        let store = store();
        let a = store.create(None).await.unwrap();
        let _b = store.create(None).await.unwrap();
        store
            .close(&a.id, TransitionTrigger::CloseRequested, "done")
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.closed, 1);
    }
}
