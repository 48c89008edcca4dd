//! One session per user, shared across callers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::catalog::Catalog;
use crate::error::EngineResult;
use crate::session::{EngineConfig, Session};
use crate::traits::{EventSink, NoopSink, SnapshotStore};

/// Hands out a single [`Session`] per user id. Sessions of different users
/// share no mutable state and run independently.
pub struct SessionRegistry {
    catalog: Arc<Catalog>,
    config: EngineConfig,
    store: Arc<dyn SnapshotStore>,
    events: Arc<dyn EventSink>,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            catalog,
            config,
            store,
            events: Arc::new(NoopSink),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The user's session, opening it from the store on first use.
    pub async fn session(&self, user_id: &str) -> EngineResult<Arc<Session>> {
        if let Some(session) = self.sessions.lock().await.get(user_id) {
            return Ok(Arc::clone(session));
        }

        // Open outside the map lock so slow loads for one user don't block others.
        let opened = Session::open(
            user_id,
            Arc::clone(&self.catalog),
            self.config.clone(),
            Arc::clone(&self.store),
        )
        .await?
        .with_events(Arc::clone(&self.events));

        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(opened));
        Ok(Arc::clone(session))
    }

    /// Drop a user's session; the next call reloads it from the store.
    pub async fn evict(&self, user_id: &str) -> bool {
        self.sessions.lock().await.remove(user_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
