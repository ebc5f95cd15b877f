//! Where tasks live between sessions: the local blob or the backend API.
//!
//! The variant is picked once by [`Persistence::select`] and never changes for the
//! rest of the session.

pub mod local;
pub mod remote;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub use local::{KeyValueStore, LocalAdapter, MemoryStore, TASKS_STORAGE_KEY};
pub use remote::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, RemoteAdapter};

use crate::error::TaskResult;
use crate::task::{CreateTaskRequest, Task, TaskFilter, TaskStats, UpdateTaskRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    Local,
    Remote,
}

#[derive(Debug, Clone)]
pub enum Persistence<S, T> {
    Local(LocalAdapter<S>),
    Remote(RemoteAdapter<T>),
}

impl<S: KeyValueStore, T: HttpTransport> Persistence<S, T> {
    /// Probes `remote` once with a stats call. Any failure falls back to `local` for
    /// the whole session.
    pub async fn select(local: LocalAdapter<S>, remote: Option<RemoteAdapter<T>>) -> Self {
        let Some(remote) = remote else {
            info!("using local storage");
            return Self::Local(local);
        };
        match remote.stats().await {
            Ok(stats) => {
                info!(total = stats.total, "connected to API backend");
                Self::Remote(remote)
            }
            Err(err) => {
                warn!(error = %err, "API not available, falling back to local storage");
                Self::Local(local)
            }
        }
    }

    pub fn mode(&self) -> PersistenceMode {
        match self {
            Self::Local(_) => PersistenceMode::Local,
            Self::Remote(_) => PersistenceMode::Remote,
        }
    }

    pub async fn load(&self, now: DateTime<Utc>) -> TaskResult<Vec<Task>> {
        match self {
            Self::Local(local) => local.load(now),
            Self::Remote(remote) => remote.list(TaskFilter::All).await,
        }
    }

    /// Server-side filtered listing. `None` means the caller filters in memory.
    pub async fn list(&self, filter: TaskFilter) -> TaskResult<Option<Vec<Task>>> {
        match self {
            Self::Local(_) => Ok(None),
            Self::Remote(remote) => remote.list(filter).await.map(Some),
        }
    }

    pub async fn save_all(&self, tasks: &[Task]) -> TaskResult<()> {
        match self {
            Self::Local(local) => local.save_all(tasks),
            Self::Remote(_) => Ok(()),
        }
    }

    /// Returns the authoritative record, or `None` when the store should build it.
    pub async fn create(&self, request: &CreateTaskRequest) -> TaskResult<Option<Task>> {
        match self {
            Self::Local(_) => Ok(None),
            Self::Remote(remote) => remote.create(request).await.map(Some),
        }
    }

    /// Returns the authoritative record, or `None` when the store should apply the patch.
    pub async fn update(&self, id: &str, patch: &UpdateTaskRequest) -> TaskResult<Option<Task>> {
        match self {
            Self::Local(_) => Ok(None),
            Self::Remote(remote) => remote.update(id, patch).await.map(Some),
        }
    }

    pub async fn delete(&self, id: &str) -> TaskResult<()> {
        match self {
            Self::Local(_) => Ok(()),
            Self::Remote(remote) => remote.delete(id).await,
        }
    }

    pub async fn stats(&self, tasks: &[Task], now: DateTime<Utc>) -> TaskResult<TaskStats> {
        match self {
            Self::Local(local) => Ok(local.stats(tasks, now)),
            Self::Remote(remote) => remote.stats().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::remote::testing::ScriptedTransport;
    use super::*;

    fn local() -> LocalAdapter<MemoryStore> {
        LocalAdapter::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn no_remote_means_local() {
        let selected: Persistence<_, ScriptedTransport> = Persistence::select(local(), None).await;
        assert_eq!(selected.mode(), PersistenceMode::Local);
    }

    #[tokio::test]
    async fn successful_probe_selects_remote() {
        let transport = ScriptedTransport::default();
        transport.reply(200, r#"{"total":2,"completed":1,"pending":1,"overdue":0}"#);
        let selected = Persistence::select(local(), Some(RemoteAdapter::new(transport.clone()))).await;
        assert_eq!(selected.mode(), PersistenceMode::Remote);
        assert_eq!(transport.sent()[0].path, "/api/stats");
    }

    #[tokio::test]
    async fn failed_probe_falls_back_without_retrying() {
        let transport = ScriptedTransport::default();
        transport.fail("connection refused");
        let selected = Persistence::select(local(), Some(RemoteAdapter::new(transport.clone()))).await;
        assert_eq!(selected.mode(), PersistenceMode::Local);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn local_mutations_are_adapter_no_ops() {
        let persistence: Persistence<_, ScriptedTransport> = Persistence::Local(local());
        assert_eq!(
            persistence.create(&CreateTaskRequest::new("x", None)).await,
            Ok(None)
        );
        assert_eq!(
            persistence.update("1", &UpdateTaskRequest::completed(true)).await,
            Ok(None)
        );
        assert_eq!(persistence.delete("1").await, Ok(()));
        assert_eq!(persistence.list(TaskFilter::Pending).await, Ok(None));
    }
}
