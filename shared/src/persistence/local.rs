use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::TaskResult;
use crate::task::{Task, TaskStats};
use crate::transfer::{decode_tasks, encode_tasks};

/// Key holding the JSON-encoded task array.
pub const TASKS_STORAGE_KEY: &str = "taskManager_tasks";

/// Persistent string key-value storage (browser `localStorage` or an in-memory map).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> TaskResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> TaskResult<()>;
}

/// Shared in-memory storage. Clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> TaskResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> TaskResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LocalAdapter<S> {
    storage: S,
    key: String,
    seed_samples: bool,
}

impl<S: KeyValueStore> LocalAdapter<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            key: TASKS_STORAGE_KEY.to_string(),
            seed_samples: false,
        }
    }

    /// Writes the onboarding tasks when nothing has been stored yet.
    pub fn with_samples(mut self, seed_samples: bool) -> Self {
        self.seed_samples = seed_samples;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self, now: DateTime<Utc>) -> TaskResult<Vec<Task>> {
        match self.storage.get(&self.key)? {
            Some(raw) => {
                let tasks = decode_tasks(&raw)?;
                debug!(count = tasks.len(), "loaded tasks from local storage");
                Ok(tasks)
            }
            None if self.seed_samples => {
                let tasks = sample_tasks(now);
                self.save_all(&tasks)?;
                info!(count = tasks.len(), "seeded sample tasks");
                Ok(tasks)
            }
            None => Ok(Vec::new()),
        }
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save_all(&self, tasks: &[Task]) -> TaskResult<()> {
        let blob = encode_tasks(tasks)?;
        self.storage.set(&self.key, &blob)
    }

    pub fn stats(&self, tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
        TaskStats::from_tasks(tasks, now)
    }
}

fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    let sample = |id: &str, text: &str, completed: bool, deadline: Option<DateTime<Utc>>| {
        let mut task = Task::new(text.to_string(), deadline, now);
        task.id = id.to_string();
        task.completed = completed;
        task
    };
    vec![
        sample(
            "1",
            "Welcome to Task Manager! Click the checkbox to mark this as complete.",
            false,
            None,
        ),
        sample(
            "2",
            "Try adding a new task with a deadline",
            false,
            Some(now + Duration::days(1)),
        ),
        sample(
            "3",
            "Use the filter buttons to view different task categories",
            true,
            None,
        ),
    ]
}
