use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{TaskError, TaskResult};
use crate::task::{validate_text, Task, TaskFilter, TaskStats, UpdateTaskRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
}

/// In-memory, newest-first collection of tasks. Ids are unique within the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> TaskResult<Self> {
        ensure_unique_ids(&tasks)?;
        Ok(Self { tasks })
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Creates a task locally and puts it first.
    pub fn add(
        &mut self,
        text: &str,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> TaskResult<&Task> {
        let text = validate_text(text)?;
        self.prepend(Task::new(text, deadline, now))
    }

    /// Puts an already created record first, e.g. one returned by the backend.
    pub fn prepend(&mut self, task: Task) -> TaskResult<&Task> {
        if self.find_by_id(&task.id).is_some() {
            return Err(TaskError::invalid(format!("duplicate task id `{}`", task.id)));
        }
        debug!(id = %task.id, "task added");
        self.tasks.insert(0, task);
        Ok(&self.tasks[0])
    }

    pub fn update(&mut self, id: &str, patch: &UpdateTaskRequest) -> TaskResult<&Task> {
        let patch = patch.validated()?;
        let index = self.position(id)?;
        patch.apply_to(&mut self.tasks[index]);
        debug!(id, "task updated");
        Ok(&self.tasks[index])
    }

    /// Overwrites the record carrying the same id, keeping its position.
    pub fn replace(&mut self, task: Task) -> TaskResult<&Task> {
        let index = self.position(&task.id)?;
        self.tasks[index] = task;
        Ok(&self.tasks[index])
    }

    pub fn remove(&mut self, id: &str) -> TaskResult<Task> {
        let index = self.position(id)?;
        debug!(id, "task removed");
        Ok(self.tasks.remove(index))
    }

    pub fn replace_all(&mut self, tasks: Vec<Task>) -> TaskResult<()> {
        ensure_unique_ids(&tasks)?;
        self.tasks = tasks;
        Ok(())
    }

    pub fn filtered(&self, filter: TaskFilter) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter().filter(move |t| filter.matches(t))
    }

    pub fn counts(&self) -> TaskCounts {
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        TaskCounts {
            total: self.tasks.len(),
            pending: self.tasks.len() - completed,
            completed,
        }
    }

    pub fn stats(&self, now: DateTime<Utc>) -> TaskStats {
        TaskStats::from_tasks(&self.tasks, now)
    }

    fn position(&self, id: &str) -> TaskResult<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }
}

pub(crate) fn ensure_unique_ids(tasks: &[Task]) -> TaskResult<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(TaskError::invalid(format!("duplicate task id `{}`", task.id)));
        }
    }
    Ok(())
}
