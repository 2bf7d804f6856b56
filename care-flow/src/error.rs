use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlowError>;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("context error: {0}")]
    ContextError(String),

    #[error("task execution failed: {0}")]
    TaskExecutionFailed(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for FlowError {
    fn from(e: sqlx::Error) -> Self {
        FlowError::Storage(e.to_string())
    }
}
