//! StateManager - actor that owns the SessionStore
//!
//! Processes commands via channels for thread-safe access to persistent
//! state. The store itself is synchronous file I/O; isolating it behind an
//! actor keeps planning tasks from blocking each other on disk access.

use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info};

use sessionstore::SessionStore;

use crate::domain::Session;

use super::messages::{StateCommand, StateError, StateResponse};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over a store at the given path
    pub fn spawn(store_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), "spawn: called");
        Self::spawn_store(SessionStore::open(store_path.as_ref())?)
    }

    /// Spawn with an explicit record TTL
    pub fn spawn_with_ttl(store_path: impl AsRef<Path>, ttl_secs: i64) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), ttl_secs, "spawn_with_ttl: called");
        Self::spawn_store(SessionStore::open_with_ttl(store_path.as_ref(), ttl_secs)?)
    }

    fn spawn_store(store: SessionStore) -> eyre::Result<Self> {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));

        info!("StateManager spawned");
        Ok(Self { tx })
    }

    /// Persist a session, replacing any prior record
    pub async fn put_session(&self, session: Session) -> StateResponse<()> {
        debug!(session_id = %session.session_id, "put_session: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::PutSession {
                session,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Load a session by id
    pub async fn get_session(&self, id: &str) -> StateResponse<Option<Session>> {
        debug!(%id, "get_session: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::GetSession {
                id: id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Delete a session by id
    pub async fn delete_session(&self, id: &str) -> StateResponse<()> {
        debug!(%id, "delete_session: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::DeleteSession {
                id: id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// List all stored session ids
    pub async fn list_sessions(&self) -> StateResponse<Vec<String>> {
        debug!("list_sessions: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::ListSessions { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Remove stored sessions past their TTL, returning how many went
    pub async fn purge_expired(&self) -> StateResponse<usize> {
        debug!("purge_expired: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::PurgeExpired { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Shut down the actor
    pub async fn shutdown(&self) {
        debug!("shutdown: called");
        let _ = self.tx.send(StateCommand::Shutdown).await;
    }
}

/// The actor task: owns the store, drains commands until shutdown
async fn actor_loop(store: SessionStore, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("actor_loop: started");

    while let Some(command) = rx.recv().await {
        match command {
            StateCommand::PutSession { session, reply } => {
                debug!(session_id = %session.session_id, "actor_loop: PutSession");
                let result = store
                    .put(&session.session_id, &session)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::GetSession { id, reply } => {
                debug!(%id, "actor_loop: GetSession");
                let result = store.get::<Session>(&id).map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::DeleteSession { id, reply } => {
                debug!(%id, "actor_loop: DeleteSession");
                let result = store.delete(&id).map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::ListSessions { reply } => {
                debug!("actor_loop: ListSessions");
                let result = store.list_ids().map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::PurgeExpired { reply } => {
                debug!("actor_loop: PurgeExpired");
                let result = store
                    .purge_expired(chrono::Utc::now())
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }
            StateCommand::Shutdown => {
                debug!("actor_loop: Shutdown");
                break;
            }
        }
    }

    info!("StateManager actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        let session = Session::new("Plan a trip to Paris", Some("test-id".to_string()));
        state.put_session(session.clone()).await.unwrap();

        let loaded = state.get_session("test-id").await.unwrap().unwrap();
        assert_eq!(loaded.session_id, "test-id");
        assert_eq!(loaded.user_query, "Plan a trip to Paris");

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_get_missing_session() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        let loaded = state.get_session("missing").await.unwrap();
        assert!(loaded.is_none());

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_purge_expired_removes_stale_records() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn_with_ttl(temp.path(), 0).unwrap();

        state.put_session(Session::new("a", Some("stale".to_string()))).await.unwrap();

        let removed = state.purge_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(state.list_sessions().await.unwrap().is_empty());

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let temp = tempdir().unwrap();
        let state = StateManager::spawn(temp.path()).unwrap();

        state.put_session(Session::new("a", Some("one".to_string()))).await.unwrap();
        state.put_session(Session::new("b", Some("two".to_string()))).await.unwrap();

        let ids = state.list_sessions().await.unwrap();
        assert_eq!(ids, vec!["one".to_string(), "two".to_string()]);

        state.delete_session("one").await.unwrap();
        let ids = state.list_sessions().await.unwrap();
        assert_eq!(ids, vec!["two".to_string()]);

        state.shutdown().await;
    }
}
