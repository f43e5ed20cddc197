//! Snapshot mirror kept next to the relational store

use crate::storage::store::KeyValueStore;
use crate::task::Task;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key holding the serialized task array
pub const SNAPSHOT_KEY: &str = "tasks";

/// Best-effort copy of the full task collection in a key-value area
///
/// Writes never fail the caller: the authoritative store wins and the
/// snapshot is rewritten on the next successful operation.
#[derive(Clone)]
pub struct SnapshotMirror {
    store: Arc<dyn KeyValueStore>,
}

impl SnapshotMirror {
    /// Create a mirror over `store`
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Replace the snapshot with `tasks`, logging any failure
    pub async fn write(&self, tasks: &[Task]) {
        let result = match serde_json::to_string(tasks) {
            Ok(json) => self.store.set(SNAPSHOT_KEY, &json).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => debug!("Mirrored {} tasks", tasks.len()),
            Err(e) => warn!("Failed to mirror task snapshot: {}", e),
        }
    }

    /// Read the last snapshot, if any
    pub async fn read(&self) -> crate::Result<Option<Vec<Task>>> {
        match self.store.get(SNAPSHOT_KEY).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
