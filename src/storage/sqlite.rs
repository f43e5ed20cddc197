//! SQLite

use crate::storage::mirror::SnapshotMirror;
use crate::storage::StorageBackend;
use crate::task::{GeoPoint, NewTask, Task, TaskId, DEFAULT_CATEGORY};
use crate::TaskManagerError;
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        task TEXT,
        date TEXT,
        location TEXT,
        distance TEXT,
        category TEXT
    )
"#;

const SELECT_ALL: &str =
    "SELECT id, task, date, location, distance, category FROM tasks ORDER BY id";

/// Task storage in an embedded SQLite database
///
/// The pool connects lazily, so nothing touches the disk until
/// [`StorageBackend::initialize`] runs. A closed pool is rebuilt by the next
/// `initialize`; an in-memory database starts empty again when that happens.
pub struct SqliteBackend {
    pool: RwLock<SqlitePool>,
    connect_options: SqliteConnectOptions,
    pool_options: SqlitePoolOptions,
    mirror: Option<SnapshotMirror>,
}

impl SqliteBackend {
    /// Create a backend for the database file at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        Self::with_options(options, SqlitePoolOptions::new().max_connections(5))
    }

    /// Create a backend over a private in-memory database
    pub fn in_memory() -> crate::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| TaskManagerError::StorageInit(e.to_string()))?;

        // A single connection that is never recycled keeps the database alive.
        let pool_options = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);

        Ok(Self::with_options(options, pool_options))
    }

    fn with_options(
        connect_options: SqliteConnectOptions,
        pool_options: SqlitePoolOptions,
    ) -> Self {
        let pool = pool_options
            .clone()
            .connect_lazy_with(connect_options.clone());

        Self {
            pool: RwLock::new(pool),
            connect_options,
            pool_options,
            mirror: None,
        }
    }

    async fn pool(&self) -> SqlitePool {
        self.pool.read().await.clone()
    }

    /// Replace the pool if a previous `close` shut it down
    async fn reopen_if_closed(&self) {
        let mut pool = self.pool.write().await;
        if pool.is_closed() {
            debug!("Reopening task database pool");
            *pool = self
                .pool_options
                .clone()
                .connect_lazy_with(self.connect_options.clone());
        }
    }

    /// Mirror the collection into `mirror` after every operation
    pub fn with_mirror(mut self, mirror: SnapshotMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    async fn fetch_all(&self) -> crate::Result<Vec<Task>> {
        let rows = sqlx::query(SELECT_ALL)
            .fetch_all(&self.pool().await)
            .await
            .map_err(|e| {
                error!("Failed to list tasks: {}", e);
                TaskManagerError::StorageRead(e.to_string())
            })?;

        rows.iter().map(row_to_task).collect()
    }

    async fn refresh_mirror(&self) {
        let Some(mirror) = &self.mirror else {
            return;
        };

        match self.fetch_all().await {
            Ok(tasks) => mirror.write(&tasks).await,
            Err(e) => warn!("Skipping mirror refresh: {}", e),
        }
    }

    /// Databases created before categories existed lack the column
    async fn ensure_category_column(&self) -> crate::Result<()> {
        let pool = self.pool().await;
        let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('tasks')")
            .fetch_all(&pool)
            .await
            .map_err(|e| TaskManagerError::StorageInit(e.to_string()))?;

        if !columns.iter().any(|c| c == "category") {
            info!("Adding category column to tasks table");
            sqlx::query("ALTER TABLE tasks ADD COLUMN category TEXT")
                .execute(&pool)
                .await
                .map_err(|e| TaskManagerError::StorageInit(e.to_string()))?;
        }
        Ok(())
    }
}

fn write_error(op: &str, e: sqlx::Error) -> TaskManagerError {
    error!("Failed to {} task: {}", op, e);
    TaskManagerError::StorageWrite(e.to_string())
}

fn encode_location(location: Option<&GeoPoint>) -> crate::Result<Option<String>> {
    location.map(GeoPoint::encode).transpose()
}

fn row_to_task(row: &SqliteRow) -> crate::Result<Task> {
    let read = |e: sqlx::Error| TaskManagerError::StorageRead(e.to_string());

    let id: i64 = row.try_get("id").map_err(read)?;
    let location: Option<String> = row.try_get("location").map_err(read)?;
    let location = location
        .filter(|text| !text.trim().is_empty())
        .and_then(|text| match text.parse::<GeoPoint>() {
            Ok(point) => Some(point),
            Err(e) => {
                warn!("Ignoring unreadable location on task {}: {}", id, e);
                None
            }
        });

    let title: Option<String> = row.try_get("task").map_err(read)?;
    let date: Option<String> = row.try_get("date").map_err(read)?;
    let category: Option<String> = row.try_get("category").map_err(read)?;

    Ok(Task {
        id,
        title: title.unwrap_or_default(),
        date: date.unwrap_or_default(),
        location,
        distance: row.try_get("distance").map_err(read)?,
        category: category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
    })
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn initialize(&self) -> crate::Result<()> {
        self.reopen_if_closed().await;

        sqlx::query(CREATE_TABLE)
            .execute(&self.pool().await)
            .await
            .map_err(|e| {
                error!("Failed to open task database: {}", e);
                TaskManagerError::StorageInit(e.to_string())
            })?;
        self.ensure_category_column().await?;

        debug!("Tasks table ready");
        Ok(())
    }

    async fn insert(&self, task: &NewTask) -> crate::Result<TaskId> {
        let location = encode_location(task.location.as_ref())?;

        let result = sqlx::query(
            "INSERT INTO tasks (task, date, location, distance, category) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&task.title)
        .bind(&task.date)
        .bind(location)
        .bind(&task.distance)
        .bind(&task.category)
        .execute(&self.pool().await)
        .await
        .map_err(|e| write_error("insert", e))?;

        let id = result.last_insert_rowid();
        debug!("Inserted task {}", id);

        self.refresh_mirror().await;
        Ok(id)
    }

    async fn update(&self, id: TaskId, fields: &NewTask) -> crate::Result<()> {
        let location = encode_location(fields.location.as_ref())?;

        let result = sqlx::query(
            "UPDATE tasks SET task = ?, date = ?, location = ?, distance = ?, category = ? WHERE id = ?",
        )
        .bind(&fields.title)
        .bind(&fields.date)
        .bind(location)
        .bind(&fields.distance)
        .bind(&fields.category)
        .bind(id)
        .execute(&self.pool().await)
        .await
        .map_err(|e| write_error("update", e))?;

        if result.rows_affected() == 0 {
            debug!("Update of missing task {} ignored", id);
            return Ok(());
        }

        self.refresh_mirror().await;
        Ok(())
    }

    async fn delete(&self, id: TaskId) -> crate::Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool().await)
            .await
            .map_err(|e| write_error("delete", e))?;

        debug!("Deleted task {}", id);
        self.refresh_mirror().await;
        Ok(())
    }

    async fn list_all(&self) -> crate::Result<Vec<Task>> {
        let tasks = self.fetch_all().await?;
        if let Some(mirror) = &self.mirror {
            mirror.write(&tasks).await;
        }
        Ok(tasks)
    }

    async fn clear(&self) -> crate::Result<()> {
        let pool = self.pool().await;
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| write_error("clear", e))?;

        sqlx::query("DELETE FROM tasks")
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error("clear", e))?;
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'tasks'")
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error("clear", e))?;

        tx.commit().await.map_err(|e| write_error("clear", e))?;

        info!("Task table cleared and identifiers reset");
        if let Some(mirror) = &self.mirror {
            mirror.write(&[]).await;
        }
        Ok(())
    }

    async fn cached_snapshot(&self) -> crate::Result<Option<Vec<Task>>> {
        match &self.mirror {
            Some(mirror) => mirror.read().await,
            None => Ok(None),
        }
    }

    async fn close(&self) {
        self.pool().await.close().await;
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool().await)
            .await
            .is_ok()
    }
}
