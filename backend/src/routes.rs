use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use serde::Deserialize;
use shared::{CreateTaskRequest, Task, TaskFilter, TaskStats, UpdateTaskRequest};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub filter: Option<String>,
}

pub async fn get_tasks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let filter = TaskFilter::parse_lenient(params.filter.as_deref());
    let tasks = state.with_repo(move |repo| repo.list(filter)).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Task>, ApiError> {
    state
        .with_repo(move |repo| repo.get(&id))
        .await?
        .map(Json)
        .ok_or(ApiError::TaskNotFound)
}

pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(payload) = payload?;
    let request = CreateTaskRequest::new(payload.validated_text()?, payload.deadline);
    let task = state
        .with_repo(move |repo| repo.create(&request, Utc::now()))
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    Path(id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(payload) = payload?;
    let patch = payload.validated()?;
    state
        .with_repo(move |repo| repo.update(&id, &patch, Utc::now()))
        .await?
        .map(Json)
        .ok_or(ApiError::TaskNotFound)
}

pub async fn delete_task(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if state.with_repo(move |repo| repo.delete(&id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::TaskNotFound)
    }
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<TaskStats>, ApiError> {
    let stats = state.with_repo(|repo| repo.stats(Utc::now())).await?;
    Ok(Json(stats))
}

pub async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}
