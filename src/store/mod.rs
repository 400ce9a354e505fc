//! In-memory task store.
//!
//! An ordered list of tasks behind a `tokio::sync::RwLock`. Mutations go
//! through `insert`/`remove`/`modify` only, so there is a single writer
//! discipline; readers get cloned snapshots.

use tokio::sync::RwLock;

use crate::models::task::Task;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
}

/// Owned, injectable store for task records. No persistence.
#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new task to the end of the list.
    pub async fn insert(&self, task: Task) {
        self.tasks.write().await.push(task);
    }

    /// Snapshot of the full ordered task list.
    pub async fn list(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Contiguous slice by list offsets. When both bounds are present and
    /// in range, returns `tasks[min..max]`; anything out of range silently
    /// falls back to the full list rather than erroring.
    pub async fn slice(&self, min: Option<usize>, max: Option<usize>) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        match (min, max) {
            (Some(min), Some(max)) if min <= max && max <= tasks.len() => {
                tasks[min..max].to_vec()
            }
            (Some(min), Some(max)) => {
                tracing::warn!(min, max, total = tasks.len(), "bad slice request, returning full list");
                tasks.clone()
            }
            _ => tasks.clone(),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Task, StoreError> {
        self.tasks
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Remove the first task with the given id, returning it.
    pub async fn remove(&self, id: &str) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let idx = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(tasks.remove(idx))
    }

    /// Mutate a task in place under the write lock.
    pub async fn modify<F, R>(&self, id: &str, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Task) -> R,
    {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(f(task))
    }
}
