pub mod config;
pub mod controller;
pub mod error;
pub mod persistence;
pub mod render;
pub mod store;
pub mod task;
pub mod transfer;

pub use config::{AppConfig, StorageMode};
pub use controller::{Controller, EditState, UserPrompt, REMOVAL_TRANSITION};
pub use error::{TaskError, TaskResult};
pub use persistence::{
    ApiRequest, ApiResponse, HttpMethod, HttpTransport, KeyValueStore, LocalAdapter, MemoryStore,
    Persistence, PersistenceMode, RemoteAdapter,
};
pub use render::{DeadlineState, TaskListView, TaskView};
pub use store::TaskStore;
pub use task::{CreateTaskRequest, ErrorBody, Task, TaskFilter, TaskStats, UpdateTaskRequest};
