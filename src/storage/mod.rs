/// Key-value backend (authoritative when no relational engine is available)
pub mod kv;
/// Snapshot mirror for fast cold-start reads
pub mod mirror;
/// Embedded SQLite backend
pub mod sqlite;
/// Key-value store implementations
pub mod store;

use crate::config::{BackendKind, Config};
use crate::task::{NewTask, Task, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub use kv::KvBackend;
pub use mirror::SnapshotMirror;
pub use sqlite::SqliteBackend;
pub use store::{FileKvStore, KeyValueStore, MemoryKvStore};

/// Trait for storage backend implementations
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Create the table/namespace if missing; existing data is kept
    async fn initialize(&self) -> crate::Result<()>;

    /// Persist a new task and return its assigned identifier
    async fn insert(&self, task: &NewTask) -> crate::Result<TaskId>;

    /// Replace every mutable field of task `id`; a missing id is a no-op
    async fn update(&self, id: TaskId, fields: &NewTask) -> crate::Result<()>;

    /// Remove task `id`
    async fn delete(&self, id: TaskId) -> crate::Result<()>;

    /// Every stored task in backend-native order
    async fn list_all(&self) -> crate::Result<Vec<Task>>;

    /// Remove all tasks and restart identifier assignment
    async fn clear(&self) -> crate::Result<()>;

    /// Last mirrored snapshot, readable before `initialize`
    async fn cached_snapshot(&self) -> crate::Result<Option<Vec<Task>>> {
        Ok(None)
    }

    /// Release the underlying engine
    async fn close(&self) {}

    /// Check if storage is healthy
    async fn health_check(&self) -> bool;
}

/// Pick and initialize a backend for `config`
///
/// With [`BackendKind::Auto`] SQLite is probed first; if it cannot be opened
/// the file key-value store is used, and failing that an in-memory store.
pub async fn open_backend(config: &Config) -> crate::Result<Box<dyn StorageBackend>> {
    match config.storage_backend {
        BackendKind::Sqlite => {
            let backend = sqlite_backend(config);
            backend.initialize().await?;
            Ok(Box::new(backend))
        }
        BackendKind::KeyValue => {
            let backend = file_kv_backend(config).await?;
            Ok(Box::new(backend))
        }
        BackendKind::Memory => Ok(Box::new(memory_backend())),
        BackendKind::Auto => {
            let backend = sqlite_backend(config);
            match backend.initialize().await {
                Ok(()) => {
                    info!("Using SQLite storage at {}", config.database_path);
                    return Ok(Box::new(backend));
                }
                Err(e) => {
                    warn!("SQLite unavailable, falling back to key-value storage: {}", e);
                    backend.close().await;
                }
            }

            match file_kv_backend(config).await {
                Ok(backend) => {
                    info!("Using key-value storage at {}", config.kv_path);
                    Ok(Box::new(backend))
                }
                Err(e) => {
                    warn!("Key-value file unavailable, keeping tasks in memory only: {}", e);
                    Ok(Box::new(memory_backend()))
                }
            }
        }
    }
}

fn sqlite_backend(config: &Config) -> SqliteBackend {
    let backend = SqliteBackend::new(&config.database_path);
    if config.enable_mirror {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileKvStore::new(&config.mirror_path));
        backend.with_mirror(SnapshotMirror::new(store))
    } else {
        backend
    }
}

async fn file_kv_backend(config: &Config) -> crate::Result<KvBackend> {
    let store = FileKvStore::new(&config.kv_path);
    store.probe().await?;
    let backend = KvBackend::new(Arc::new(store));
    backend.initialize().await?;
    Ok(backend)
}

fn memory_backend() -> KvBackend {
    KvBackend::in_memory()
}
