use std::sync::Arc;
use task_manager_rs::config::{BackendKind, Config};
use task_manager_rs::storage::{
    self, KeyValueStore, MemoryKvStore, SnapshotMirror, SqliteBackend, StorageBackend,
};
use task_manager_rs::task::{Task, TaskDraft};
use task_manager_rs::{ManagerState, TaskManager};

async fn snapshot(store: &MemoryKvStore) -> Vec<Task> {
    let json = store.get("tasks").await.unwrap().unwrap();
    serde_json::from_str(&json).unwrap()
}

fn mirrored_backend() -> (SqliteBackend, MemoryKvStore) {
    let store = MemoryKvStore::new();
    let mirror = SnapshotMirror::new(Arc::new(store.clone()));
    let backend = SqliteBackend::in_memory().unwrap().with_mirror(mirror);
    (backend, store)
}

#[tokio::test]
async fn test_mirror_tracks_every_mutation() {
    let (backend, store) = mirrored_backend();
    backend.initialize().await.unwrap();

    let a = TaskDraft::new("a", "2020-01-01").validate().unwrap();
    let b = TaskDraft::new("b", "2030-01-01").validate().unwrap();

    let id_a = backend.insert(&a).await.unwrap();
    let id_b = backend.insert(&b).await.unwrap();
    assert_eq!(snapshot(&store).await.len(), 2);

    let renamed = TaskDraft::new("a2", "2020-01-01").validate().unwrap();
    backend.update(id_a, &renamed).await.unwrap();
    assert_eq!(snapshot(&store).await[0].title, "a2");

    backend.delete(id_b).await.unwrap();
    let mirrored = snapshot(&store).await;
    assert_eq!(mirrored, backend.list_all().await.unwrap());
    assert_eq!(mirrored.len(), 1);

    backend.clear().await.unwrap();
    assert!(snapshot(&store).await.is_empty());
}

struct BrokenStore;

#[async_trait::async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> task_manager_rs::Result<Option<String>> {
        Err(task_manager_rs::TaskManagerError::StorageRead("offline".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> task_manager_rs::Result<()> {
        Err(task_manager_rs::TaskManagerError::StorageWrite("offline".into()))
    }

    async fn remove(&self, _key: &str) -> task_manager_rs::Result<()> {
        Err(task_manager_rs::TaskManagerError::StorageWrite("offline".into()))
    }
}

#[tokio::test]
async fn test_mirror_failure_is_not_fatal() {
    let backend = SqliteBackend::in_memory()
        .unwrap()
        .with_mirror(SnapshotMirror::new(Arc::new(BrokenStore)));
    backend.initialize().await.unwrap();

    let task = TaskDraft::new("a", "2020-01-01").validate().unwrap();
    let id = backend.insert(&task).await.unwrap();
    backend.delete(id).await.unwrap();
    assert!(backend.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hydrate_reads_snapshot_before_open() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        storage_backend: BackendKind::Sqlite,
        database_path: dir.path().join("tasks.db").display().to_string(),
        mirror_path: dir.path().join("cache.json").display().to_string(),
        ..Config::default()
    };

    {
        let mut manager = TaskManager::new(storage::open_backend(&config).await.unwrap());
        manager.open().await.unwrap();
        manager.add(&TaskDraft::new("Réunion", "2020-01-01")).await.unwrap();
        manager.close().await;
    }

    let backend = storage::SqliteBackend::new(&config.database_path).with_mirror(
        SnapshotMirror::new(Arc::new(storage::FileKvStore::new(&config.mirror_path))),
    );
    let mut manager = TaskManager::new(Box::new(backend));

    let hydrated = manager.hydrate().await.unwrap().to_vec();
    assert_eq!(manager.state(), ManagerState::Uninitialized);
    assert_eq!(hydrated.len(), 1);
    assert_eq!(hydrated[0].title, "Réunion");

    manager.open().await.unwrap();
    assert_eq!(manager.tasks(), hydrated.as_slice());
}

#[tokio::test]
async fn test_auto_prefers_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        database_path: dir.path().join("tasks.db").display().to_string(),
        kv_path: dir.path().join("tasks.kv.json").display().to_string(),
        mirror_path: dir.path().join("cache.json").display().to_string(),
        ..Config::default()
    };

    let backend = storage::open_backend(&config).await.unwrap();
    assert_eq!(backend.name(), "sqlite");
    backend.close().await;
}

#[tokio::test]
async fn test_auto_falls_back_to_key_value() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        database_path: dir.path().join("no-such-dir").join("tasks.db").display().to_string(),
        kv_path: dir.path().join("tasks.kv.json").display().to_string(),
        ..Config::default()
    };

    let backend = storage::open_backend(&config).await.unwrap();
    assert_eq!(backend.name(), "keyvalue");

    let mut manager = TaskManager::new(backend);
    manager.open().await.unwrap();
    let task = manager.add(&TaskDraft::new("secours", "2020-01-01")).await.unwrap();
    assert_eq!(task.id, 1);
    assert!(dir.path().join("tasks.kv.json").exists());
}

#[tokio::test]
async fn test_auto_falls_back_to_memory() {
    let dir = tempfile::tempdir().unwrap();
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, "not a directory").unwrap();

    let config = Config {
        database_path: blocked.join("tasks.db").display().to_string(),
        kv_path: blocked.join("tasks.kv.json").display().to_string(),
        ..Config::default()
    };

    let backend = storage::open_backend(&config).await.unwrap();
    assert_eq!(backend.name(), "memory");
    assert!(backend.health_check().await);
    assert!(backend.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_explicit_sqlite_failure_is_surfaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        storage_backend: BackendKind::Sqlite,
        database_path: dir.path().join("no-such-dir").join("tasks.db").display().to_string(),
        ..Config::default()
    };

    assert!(storage::open_backend(&config).await.is_err());
}
