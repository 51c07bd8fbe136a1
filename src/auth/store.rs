// ABOUTME: In-process session store that prunes expired records on a fixed interval
// ABOUTME: Implements tower_sessions::SessionStore over a mutex-guarded HashMap

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_sessions::{
    session::{Id, Record},
    session_store, SessionStore,
};

/// How often expired sessions are swept from the store
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Memory-backed session store. Expired records are never returned by
/// `load`, and are physically removed by [`PrunedMemoryStore::prune_expired`].
#[derive(Debug, Clone, Default)]
pub struct PrunedMemoryStore(Arc<Mutex<HashMap<Id, Record>>>);

impl PrunedMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every expired record, returning how many were dropped
    pub async fn prune_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut records = self.0.lock().await;
        let before = records.len();
        records.retain(|_, record| record.expiry_date > now);
        before - records.len()
    }

    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.0.lock().await.is_empty()
    }

    /// Sweep expired records every `period`, independent of request traffic.
    /// The task runs until aborted.
    pub fn spawn_pruning(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.prune_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "Pruned expired sessions");
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for PrunedMemoryStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.0.lock().await;
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.0.lock().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .0
            .lock()
            .await
            .get(session_id)
            .filter(|record| record.expiry_date > now)
            .cloned())
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.0.lock().await.remove(session_id);
        Ok(())
    }
}
