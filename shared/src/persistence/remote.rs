use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{TaskError, TaskResult};
use crate::task::{CreateTaskRequest, ErrorBody, Task, TaskFilter, TaskStats, UpdateTaskRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A request against the task API; `path` starts with `/api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request and returns whatever status came back. Only failures to reach
/// the server at all are errors here.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn send(&self, request: ApiRequest) -> TaskResult<ApiResponse>;
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_json<B: Serialize>(method: HttpMethod, path: impl Into<String>, body: &B) -> TaskResult<Self> {
        let body = serde_json::to_string(body)
            .map_err(|err| TaskError::invalid(format!("failed to serialize request: {err}")))?;
        Ok(Self {
            method,
            path: path.into(),
            body: Some(body),
        })
    }
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// REST client for the backend; one request per operation.
#[derive(Debug, Clone)]
pub struct RemoteAdapter<T> {
    transport: T,
}

impl<T: HttpTransport> RemoteAdapter<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub async fn list(&self, filter: TaskFilter) -> TaskResult<Vec<Task>> {
        let path = match filter {
            TaskFilter::All => "/api/tasks".to_string(),
            other => format!("/api/tasks?filter={other}"),
        };
        self.fetch_json(ApiRequest::get(path), None).await
    }

    pub async fn get(&self, id: &str) -> TaskResult<Task> {
        self.fetch_json(ApiRequest::get(task_path(id)), Some(id)).await
    }

    pub async fn create(&self, request: &CreateTaskRequest) -> TaskResult<Task> {
        let request = ApiRequest::with_json(HttpMethod::Post, "/api/tasks", request)?;
        self.fetch_json(request, None).await
    }

    pub async fn update(&self, id: &str, patch: &UpdateTaskRequest) -> TaskResult<Task> {
        let request = ApiRequest::with_json(HttpMethod::Put, task_path(id), patch)?;
        self.fetch_json(request, Some(id)).await
    }

    pub async fn delete(&self, id: &str) -> TaskResult<()> {
        self.fetch(ApiRequest::delete(task_path(id)), Some(id)).await?;
        Ok(())
    }

    pub async fn stats(&self) -> TaskResult<TaskStats> {
        self.fetch_json(ApiRequest::get("/api/stats"), None).await
    }

    async fn fetch_json<R: DeserializeOwned>(&self, request: ApiRequest, id: Option<&str>) -> TaskResult<R> {
        let response = self.fetch(request, id).await?;
        serde_json::from_str(&response.body).map_err(|err| TaskError::Server {
            status: response.status,
            message: format!("Failed to parse JSON: {err}"),
        })
    }

    async fn fetch(&self, request: ApiRequest, id: Option<&str>) -> TaskResult<ApiResponse> {
        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.send(request).await.inspect_err(|err| {
            warn!(method = method.as_str(), %path, error = %err, "API request failed");
        })?;
        debug!(method = method.as_str(), %path, status = response.status, "API response");
        check_status(response, id)
    }
}

fn task_path(id: &str) -> String {
    format!("/api/tasks/{id}")
}

fn check_status(response: ApiResponse, id: Option<&str>) -> TaskResult<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }
    if let (404, Some(id)) = (response.status, id) {
        return Err(TaskError::NotFound(id.to_string()));
    }
    let message = serde_json::from_str::<ErrorBody>(&response.body)
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("HTTP error! status: {}", response.status));
    Err(TaskError::Server {
        status: response.status,
        message,
    })
}
