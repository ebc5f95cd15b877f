pub mod config;
pub mod db;
pub mod error;
pub mod routes;

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::handler::HandlerWithoutStateExt;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::db::TaskRepository;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    repo: Arc<Mutex<TaskRepository>>,
}

impl AppState {
    pub fn new(repo: TaskRepository) -> Self {
        Self {
            repo: Arc::new(Mutex::new(repo)),
        }
    }

    /// Runs `f` against the repository on the blocking pool so SQLite I/O never
    /// stalls an async worker. Calls are serialized by the connection mutex.
    pub async fn with_repo<F, R>(&self, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&TaskRepository) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let repo = Arc::clone(&self.repo);
        tokio::task::spawn_blocking(move || -> Result<R, ApiError> {
            let repo = repo
                .lock()
                .map_err(|_| ApiError::Internal("task database lock poisoned".to_string()))?;
            Ok(f(&repo)?)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("database task failed: {err}")))?
    }
}

/// The task API under `/api`, plus static files from `static_dir` when given.
/// Anything else answers `404 {"error":"Route not found"}`.
pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/tasks", get(routes::get_tasks).post(routes::create_task))
        .route(
            "/tasks/:id",
            get(routes::get_task)
                .put(routes::update_task)
                .delete(routes::delete_task),
        )
        .route("/stats", get(routes::get_stats))
        .fallback(routes::route_not_found);

    let router = Router::new().nest("/api", api);
    let router = match static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).not_found_service(routes::route_not_found.into_service()),
        ),
        None => router.fallback(routes::route_not_found),
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
