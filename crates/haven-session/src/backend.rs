//! Pluggable session storage.
//!
//! The in-memory backend is the default; durability guarantees beyond it are
//! a backend concern, not the store's.

use async_trait::async_trait;
use dashmap::DashMap;
use haven_types::{Session, SessionId};

use crate::error::Result;

/// Storage backend for session records.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn put(&self, session: &Session) -> Result<()>;

    async fn get(&self, id: &SessionId) -> Result<Option<Session>>;

    async fn remove(&self, id: &SessionId) -> Result<()>;

    async fn list(&self) -> Result<Vec<Session>>;
}

/// In-memory backend on a concurrent map.
#[derive(Default)]
pub struct MemoryBackend {
    sessions: DashMap<SessionId, Session>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn put(&self, session: &Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    async fn remove(&self, id: &SessionId) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Session>> {
        Ok(self.sessions.iter().map(|r| r.value().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_remove_round_trip() {
        let backend = MemoryBackend::new();
        let session = Session::new(None, 50, 30);
        let id = session.id.clone();

        backend.put(&session).await.unwrap();
        assert!(backend.get(&id).await.unwrap().is_some());

        backend.remove(&id).await.unwrap();
        assert!(backend.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_returns_all_sessions() {
        let backend = MemoryBackend::new();
        for _ in 0..3 {
            backend.put(&Session::new(None, 50, 30)).await.unwrap();
        }
        assert_eq!(backend.list().await.unwrap().len(), 3);
    }
}
