use crate::error::StoreError;
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter, TaskStats};

/// Durable task storage keyed by id.
///
/// Every write is a single atomic statement, so implementations need no
/// transaction handling. Calls are blocking; the API runs them on actix's
/// blocking thread pool.
pub trait TaskStore: Send + Sync {
    /// Tasks matching `filter`, newest `created_at` first (ties by id, newest first).
    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;

    fn get(&self, id: i32) -> Result<Option<Task>, StoreError>;

    fn create(&self, task: NewTask) -> Result<Task, StoreError>;

    /// Applies `changes` and returns the updated row, or `None` if `id` is unknown.
    fn update(&self, id: i32, changes: TaskChanges) -> Result<Option<Task>, StoreError>;

    /// Removes and returns the row, or `None` if `id` is unknown.
    fn delete(&self, id: i32) -> Result<Option<Task>, StoreError>;

    fn stats(&self) -> Result<TaskStats, StoreError>;

    /// Cheap round trip used by the health check.
    fn ping(&self) -> Result<(), StoreError>;
}
