//! Error types for the toolchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded
//! context has its own error enum; only transport-layer failures from
//! the provider are allowed to propagate into the iteration engine,
//! which converts them into user-visible text in one place.

use thiserror::Error;

/// The top-level error type for all toolchat operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures from the LLM transport layer.
///
/// These are fatal for the current engine call. The engine maps each
/// variant to an actionable user-visible message.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures raised by tool implementations.
///
/// The dispatcher catches all of these and converts them into a
/// `DispatchOutcome`; they never cross the engine boundary as errors.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool server unavailable: {server}: {reason}")]
    ServerUnavailable { server: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
