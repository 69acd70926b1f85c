//! Error types, one enum per area plus the umbrella [`Error`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to a hosted model.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("model API returned {status_code}: {message}")]
    ApiError { status_code: u16, message: String },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("unknown model: {0}")]
    ModelNotFound(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("network failure: {0}")]
    Network(String),
}

impl ProviderError {
    /// HTTP status behind the error. `None` when no response arrived.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            Self::RateLimited { .. } => Some(429),
            Self::ModelNotFound(_) => Some(404),
            Self::AuthenticationFailed(_) | Self::Timeout(_) | Self::Network(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory storage: {0}")]
    Storage(String),

    #[error("memory query: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no such session: {0}")]
    NotFound(String),

    #[error("session exists already: {0}")]
    AlreadyExists(String),

    #[error("session storage: {0}")]
    Storage(String),

    #[error("session query: {0}")]
    QueryFailed(String),

    #[error("session schema setup: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    /// A delegate was invoked before the agent whose output it depends on.
    #[error("Tool {tool_name} called out of order: {reason}")]
    PreconditionFailed { tool_name: String, reason: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}
