//! In-process snapshot store for tests and embedding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use certpath_core::traits::{Snapshot, SnapshotStore};

/// Keeps snapshots in a map. Writes can be made to fail on demand to
/// exercise the engine's persistence-failure path.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<String, Snapshot>>,
    fail_writes: AtomicBool,
    save_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing snapshots.
    pub fn with_snapshots(snapshots: impl IntoIterator<Item = (String, Snapshot)>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Make every following `save` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::Relaxed)
    }

    /// The last snapshot written for a user.
    pub fn get(&self, user_id: &str) -> Option<Snapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, user_id: &str) -> Result<Option<Snapshot>> {
        Ok(self.get(user_id))
    }

    async fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            anyhow::bail!("memory store: write rejected for {user_id}");
        }
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id.to_string(), snapshot.clone());
        self.save_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
