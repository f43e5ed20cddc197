//! Task Manager RS - a local task store for a mobile to-do application
//!
//! Tasks are persisted either in an embedded SQLite database (with a
//! best-effort JSON snapshot mirror) or in a key-value blob store when no
//! relational engine is available. The [`manager::TaskManager`] facade sits on
//! top of either backend and derives recent/upcoming views from the loaded
//! collection.

/// Configuration management
pub mod config;
/// Task manager facade used by the front end
pub mod manager;
/// Storage backend implementations
pub mod storage;
/// Task record model and validation
pub mod task;
/// Geolocation watch and tracking notifications
pub mod tracking;
/// Recent / upcoming / per-category projections
pub mod views;

pub use config::Config;
pub use manager::{ManagerState, TaskManager};
pub use task::{GeoPoint, NewTask, Task, TaskDraft, TaskId};
pub use views::TaskViews;

use thiserror::Error;

/// Result type for task manager operations
pub type Result<T> = std::result::Result<T, TaskManagerError>;

/// Error types for the task manager
#[derive(Error, Debug)]
pub enum TaskManagerError {
    /// Candidate task failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Underlying storage engine could not be opened
    #[error("Storage initialization failed: {0}")]
    StorageInit(String),

    /// Insert, update, delete or clear failed
    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    /// Reading the stored collection failed
    #[error("Storage read failed: {0}")]
    StorageRead(String),

    /// Location or notification permission was refused
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation issued before the manager finished opening
    #[error("Task manager is not ready (state: {0})")]
    NotReady(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Location tracker lifecycle error
    #[error("Tracking error: {0}")]
    TrackingError(String),
}

impl TaskManagerError {
    /// Whether the error came from the persistence layer
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::StorageInit(_) | Self::StorageWrite(_) | Self::StorageRead(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let err = TaskManagerError::Validation("title is required".to_string());
        assert_eq!(err.to_string(), "Validation error: title is required");

        let err = TaskManagerError::NotReady("Loading".to_string());
        assert_eq!(err.to_string(), "Task manager is not ready (state: Loading)");
    }

    #[test]
    fn test_storage_classification() {
        assert!(TaskManagerError::StorageWrite("disk full".into()).is_storage());
        assert!(TaskManagerError::StorageInit("locked".into()).is_storage());
        assert!(!TaskManagerError::Validation("x".into()).is_storage());
    }
}
