use std::cmp::Reverse;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::error::StoreError;
use crate::models::task::{NewTask, Task, TaskChanges, TaskFilter, TaskStats};
use crate::repository::store::TaskStore;

#[derive(Debug, Default)]
struct MemoryState {
    tasks: Vec<Task>,
    last_id: i32,
}

/// Process-local task store with the same ordering and statistics semantics
/// as the Postgres one. "Today" is the current UTC date, matching the UTC
/// sessions of [`Database`](super::database::Database).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|state| state.tasks.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl TaskStore for MemoryStore {
    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let state = self.lock()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| Reverse((task.created_at, task.id)));
        Ok(tasks)
    }

    fn get(&self, id: i32) -> Result<Option<Task>, StoreError> {
        let state = self.lock()?;
        Ok(state.tasks.iter().find(|task| task.id == id).cloned())
    }

    fn create(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut state = self.lock()?;
        state.last_id += 1;
        let task = Task {
            id: state.last_id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    fn update(&self, id: i32, changes: TaskChanges) -> Result<Option<Task>, StoreError> {
        let mut state = self.lock()?;
        let Some(task) = state.tasks.iter_mut().find(|task| task.id == id) else {
            return Ok(None);
        };
        changes.apply(task);
        Ok(Some(task.clone()))
    }

    fn delete(&self, id: i32) -> Result<Option<Task>, StoreError> {
        let mut state = self.lock()?;
        let index = state.tasks.iter().position(|task| task.id == id);
        Ok(index.map(|index| state.tasks.remove(index)))
    }

    fn stats(&self) -> Result<TaskStats, StoreError> {
        let state = self.lock()?;
        Ok(TaskStats::tally(&state.tasks, Utc::now().date_naive()))
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::CreateTaskRequest;
    use crate::models::task::{TaskPriority, TaskStatus};
    use chrono::Duration;

    fn new_task(title: &str) -> NewTask {
        CreateTaskRequest::titled(title).into_new_task(Utc::now()).unwrap()
    }

    #[test]
    fn ids_are_unique_and_never_reused() {
        let store = MemoryStore::new();
        let first = store.create(new_task("a")).unwrap();
        let second = store.create(new_task("b")).unwrap();
        assert_ne!(first.id, second.id);

        store.delete(second.id).unwrap();
        let third = store.create(new_task("c")).unwrap();
        assert!(third.id > second.id);
    }

    #[test]
    fn list_is_newest_first_with_id_tiebreak() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut older = new_task("older");
        older.created_at = now - Duration::minutes(1);
        store.create(older).unwrap();

        let mut same_a = new_task("same a");
        same_a.created_at = now;
        store.create(same_a).unwrap();
        let mut same_b = new_task("same b");
        same_b.created_at = now;
        store.create(same_b).unwrap();

        let titles: Vec<_> = store
            .list(&TaskFilter::default())
            .unwrap()
            .into_iter()
            .map(|task| task.title)
            .collect();
        assert_eq!(titles, vec!["same b", "same a", "older"]);
    }

    #[test]
    fn update_and_delete_unknown_ids_are_none() {
        let store = MemoryStore::new();
        store.create(new_task("only")).unwrap();
        assert_eq!(store.update(42, TaskChanges::touch(Utc::now())).unwrap(), None);
        assert_eq!(store.delete(42).unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn stats_reflect_current_contents() {
        let store = MemoryStore::new();
        let mut overdue = new_task("overdue");
        overdue.due_date = Some(Utc::now().date_naive() - Duration::days(3));
        overdue.priority = TaskPriority::High;
        store.create(overdue).unwrap();
        let mut done = new_task("done");
        done.status = TaskStatus::Completed;
        store.create(done).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.pending_tasks, 1);
        assert_eq!(stats.high_priority_tasks, 1);
        assert_eq!(stats.overdue_tasks, 1);
    }
}
