//! Boundary traits: durable snapshot storage and engine event delivery.
//!
//! Stores are implemented in `certpath-store`; event sinks belong to whatever
//! presentation layer animates point deltas and unlocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ledger::{LedgerState, Resolution};
use crate::model::Module;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Snapshot store
// ---------------------------------------------------------------------------

/// Persisted form of one user's progression and ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Modules with their statuses, in pathway order.
    pub modules: Vec<Module>,
    #[serde(default)]
    pub ledger: LedgerState,
    /// Administrative override for this session.
    #[serde(default)]
    pub admin_override: bool,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Durable storage for session snapshots.
///
/// `save` must be atomic: after it returns, a later `load` sees either the
/// whole new snapshot or, on error, the whole previous one.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Human-readable store name (e.g. "json-file").
    fn name(&self) -> &str;

    /// Load a user's snapshot. `None` means nothing has been stored yet.
    async fn load(&self, user_id: &str) -> anyhow::Result<Option<Snapshot>>;

    /// Replace a user's snapshot.
    async fn save(&self, user_id: &str, snapshot: &Snapshot) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Engine events
// ---------------------------------------------------------------------------

/// Discrete, committed state changes for a presentation layer to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ModuleCompleted { module_id: String },
    ModuleUnlocked { module_id: String },
    PathwayFinished,
    XpGranted { amount: u64, transaction_id: String },
    PendingPosted { amount: u64, transaction_id: String },
    PendingResolved {
        transaction_id: String,
        resolution: Resolution,
    },
    Spent { amount: u64, transaction_id: String },
    OverrideToggled { enabled: bool },
    TierReached { tier: String },
}

/// Receiver of engine events. Called after the state is durably committed.
pub trait EventSink: Send + Sync {
    fn on_event(&self, user_id: &str, event: &EngineEvent);
}

/// No-op event sink.
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&self, _: &str, _: &EngineEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_defaults_for_missing_fields() {
        let snapshot: Snapshot = serde_json::from_str(r#"{"modules":[]}"#).unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert!(!snapshot.admin_override);
        assert_eq!(snapshot.ledger, LedgerState::default());
    }

    #[test]
    fn events_serialize_tagged() {
        let json = serde_json::to_value(EngineEvent::XpGranted {
            amount: 250,
            transaction_id: "t1".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "xp_granted");
        assert_eq!(json["amount"], 250);
    }
}
