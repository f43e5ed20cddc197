//! Task manager facade

use crate::storage::StorageBackend;
use crate::task::{Task, TaskDraft, TaskId};
use crate::views::{self, CategoryGroup, TaskViews};
use crate::TaskManagerError;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, error, info};

/// Lifecycle of a [`TaskManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Storage not opened yet (or closed again)
    Uninitialized,
    /// `open` is running
    Loading,
    /// Storage open and collection loaded
    Ready,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "Uninitialized",
            Self::Loading => "Loading",
            Self::Ready => "Ready",
        };
        f.write_str(name)
    }
}

/// The single entry point the front end uses for tasks
///
/// Operations issued outside [`ManagerState::Ready`] are rejected with
/// [`TaskManagerError::NotReady`] rather than queued. A failed storage call
/// leaves the in-memory collection untouched.
pub struct TaskManager {
    backend: Box<dyn StorageBackend>,
    tasks: Vec<Task>,
    state: ManagerState,
}

impl TaskManager {
    /// Wrap an already constructed backend; call [`TaskManager::open`] next
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            tasks: Vec::new(),
            state: ManagerState::Uninitialized,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Name of the backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Last loaded collection
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Look up a loaded task by id
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Show the mirrored snapshot while storage is still opening
    ///
    /// Does not change state; the next successful `load` replaces it.
    pub async fn hydrate(&mut self) -> crate::Result<&[Task]> {
        if self.state == ManagerState::Uninitialized {
            if let Some(snapshot) = self.backend.cached_snapshot().await? {
                debug!("Hydrated {} tasks from snapshot", snapshot.len());
                self.tasks = snapshot;
            }
        }
        Ok(&self.tasks)
    }

    /// Initialize storage and load the collection
    pub async fn open(&mut self) -> crate::Result<&[Task]> {
        if self.state == ManagerState::Ready {
            return Ok(&self.tasks);
        }

        self.state = ManagerState::Loading;
        info!("Opening task storage ({})", self.backend.name());

        match self.initialize_and_list().await {
            Ok(tasks) => {
                self.tasks = tasks;
                self.state = ManagerState::Ready;
                info!("Task manager ready with {} tasks", self.tasks.len());
                Ok(&self.tasks)
            }
            Err(e) => {
                error!("Failed to open task storage: {}", e);
                self.state = ManagerState::Uninitialized;
                Err(e)
            }
        }
    }

    async fn initialize_and_list(&self) -> crate::Result<Vec<Task>> {
        self.backend.initialize().await?;
        self.backend.list_all().await
    }

    /// Release storage and drop the loaded collection
    ///
    /// The manager can be opened again afterwards.
    pub async fn close(&mut self) {
        self.backend.close().await;
        self.tasks.clear();
        self.state = ManagerState::Uninitialized;
        info!("Task manager closed");
    }

    fn ensure_ready(&self) -> crate::Result<()> {
        if self.state == ManagerState::Ready {
            Ok(())
        } else {
            Err(TaskManagerError::NotReady(self.state.to_string()))
        }
    }

    /// Re-read the collection from storage
    pub async fn load(&mut self) -> crate::Result<&[Task]> {
        self.ensure_ready()?;
        self.tasks = self.backend.list_all().await?;
        Ok(&self.tasks)
    }

    /// Validate and store a new task, returning the stored record
    pub async fn add(&mut self, candidate: &TaskDraft) -> crate::Result<Task> {
        self.ensure_ready()?;
        let task = candidate.validate()?;

        let id = self.backend.insert(&task).await?;
        self.load().await?;

        let stored = self.get(id).cloned().ok_or_else(|| {
            TaskManagerError::StorageRead(format!("Task {} missing after insert", id))
        })?;
        info!("Added task {} ({})", stored.id, stored.title);
        Ok(stored)
    }

    /// Replace the fields of task `id`; an unknown id changes nothing
    pub async fn edit(&mut self, id: TaskId, candidate: &TaskDraft) -> crate::Result<()> {
        self.ensure_ready()?;
        let fields = candidate.validate()?;

        self.backend.update(id, &fields).await?;
        self.load().await?;
        debug!("Edited task {}", id);
        Ok(())
    }

    /// Delete task `id`
    pub async fn remove(&mut self, id: TaskId) -> crate::Result<()> {
        self.ensure_ready()?;
        self.backend.delete(id).await?;
        self.load().await?;
        debug!("Removed task {}", id);
        Ok(())
    }

    /// Delete every task and restart identifiers at their initial value
    pub async fn clear(&mut self) -> crate::Result<()> {
        self.ensure_ready()?;
        self.backend.clear().await?;
        self.load().await?;
        Ok(())
    }

    /// Recent and upcoming views of the loaded collection
    pub fn views(&self, now: DateTime<Utc>) -> TaskViews {
        views::partition(&self.tasks, now)
    }

    /// Loaded collection grouped by category
    pub fn by_category(&self) -> Vec<CategoryGroup> {
        views::by_category(&self.tasks)
    }

    /// Loaded tasks in `category`, in collection order
    pub fn in_category(&self, category: &str) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.category == category)
            .cloned()
            .collect()
    }
}
