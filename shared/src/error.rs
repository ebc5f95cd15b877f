use thiserror::Error;

pub type TaskResult<T> = Result<T, TaskError>;

/// Failure taxonomy shared by the store, the persistence adapters and the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Rejected locally before anything was mutated.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// Unreadable persisted blob or import file.
    #[error("storage error: {0}")]
    Storage(String),
}

impl TaskError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Whether the failure should be shown to the user as a blocking notification.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::InvalidInput(_))
    }

    /// Text shown in the blocking notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(message) | Self::Storage(message) => message.clone(),
            Self::NotFound(_) => "That task no longer exists.".to_string(),
            Self::Network(_) | Self::Server { .. } => {
                "Failed to save changes. Please try again.".to_string()
            }
        }
    }
}
