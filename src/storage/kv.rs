//! Key-value backend

use crate::storage::store::{KeyValueStore, MemoryKvStore};
use crate::storage::StorageBackend;
use crate::task::{NewTask, Task, TaskId};
use crate::TaskManagerError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Key holding the serialized task array
pub const TASKS_KEY: &str = "tasks";
/// Key holding the next identifier to assign
pub const COUNTER_KEY: &str = "tasksCounter";

/// Task storage over a key-value area
///
/// The whole collection lives as one JSON array under [`TASKS_KEY`];
/// identifiers come from a counter under [`COUNTER_KEY`].
pub struct KvBackend {
    store: Arc<dyn KeyValueStore>,
    name: &'static str,
}

impl KvBackend {
    /// Create a backend over `store`
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            name: "keyvalue",
        }
    }

    /// Create a non-persistent backend
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryKvStore::new()),
            name: "memory",
        }
    }

    async fn read_tasks(&self) -> crate::Result<Vec<Task>> {
        match self.store.get(TASKS_KEY).await? {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                TaskManagerError::StorageRead(format!("Corrupt task collection: {}", e))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn write_tasks(&self, tasks: &[Task]) -> crate::Result<()> {
        let json = serde_json::to_string(tasks)?;
        self.store.set(TASKS_KEY, &json).await
    }

    async fn next_id(&self, tasks: &[Task]) -> crate::Result<TaskId> {
        let stored = self.store.get(COUNTER_KEY).await?;
        let from_tasks = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;

        // A counter behind the stored ids would hand out a duplicate.
        match stored.and_then(|v| v.trim().parse::<TaskId>().ok()) {
            Some(counter) => Ok(counter.max(from_tasks)),
            None => Ok(from_tasks),
        }
    }
}

#[async_trait]
impl StorageBackend for KvBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&self) -> crate::Result<()> {
        let existing = self
            .store
            .get(TASKS_KEY)
            .await
            .map_err(|e| TaskManagerError::StorageInit(e.to_string()))?;

        if existing.is_none() {
            self.store
                .set(TASKS_KEY, "[]")
                .await
                .map_err(|e| TaskManagerError::StorageInit(e.to_string()))?;
            self.store
                .set(COUNTER_KEY, "1")
                .await
                .map_err(|e| TaskManagerError::StorageInit(e.to_string()))?;
            info!("Initialized empty task collection");
        }
        Ok(())
    }

    async fn insert(&self, task: &NewTask) -> crate::Result<TaskId> {
        let mut tasks = self.read_tasks().await?;
        let id = self.next_id(&tasks).await?;

        tasks.push(task.clone().with_id(id));
        self.write_tasks(&tasks).await?;
        self.store.set(COUNTER_KEY, &(id + 1).to_string()).await?;

        debug!("Inserted task {}", id);
        Ok(id)
    }

    async fn update(&self, id: TaskId, fields: &NewTask) -> crate::Result<()> {
        let mut tasks = self.read_tasks().await?;
        match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => task.apply(fields),
            None => {
                debug!("Update of missing task {} ignored", id);
                return Ok(());
            }
        }
        self.write_tasks(&tasks).await
    }

    async fn delete(&self, id: TaskId) -> crate::Result<()> {
        let mut tasks = self.read_tasks().await?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);

        if tasks.len() != before {
            self.write_tasks(&tasks).await?;
            debug!("Deleted task {}", id);
        }
        Ok(())
    }

    async fn list_all(&self) -> crate::Result<Vec<Task>> {
        self.read_tasks().await
    }

    async fn clear(&self) -> crate::Result<()> {
        self.store.remove(TASKS_KEY).await?;
        self.store.remove(COUNTER_KEY).await?;
        info!("Task collection cleared and identifiers reset");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.store.get(COUNTER_KEY).await.is_ok()
    }
}
