use super::{normalize_title, Task, TaskId, TaskStatus};
use crate::error::Result;
use crate::storage::Store;

/// Today-scoped view over the store. Holds no state of its own.
pub struct TaskRegistry<'a> {
    store: &'a Store,
}

impl<'a> TaskRegistry<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Creates a pending task for today. Blank titles never reach the store.
    pub fn create(&self, title: &str) -> Result<Task> {
        let title = normalize_title(title)?;
        self.store.create_task(&title)
    }

    /// Flips Pending and Done. Returns `None` for an unknown id.
    pub fn toggle(&self, id: TaskId) -> Result<Option<TaskStatus>> {
        self.store.toggle_task_status(id)
    }

    pub fn remove(&self, id: TaskId) -> Result<()> {
        self.store.delete_task(id)
    }

    pub fn list_today(&self) -> Result<Vec<Task>> {
        self.store.list_tasks_for_today()
    }
}
