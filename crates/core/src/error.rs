//! Error types for the chatloom domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all pipeline operations.
///
/// A consumer draining a pipeline stream sees at most one of these, as the
/// terminal item of the event sequence. Tool failures are absorbed by the
/// fallback path and never surface here unless the fallback itself fails.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The pipeline was used before it was ready: no transport handle, or a
    /// missing/empty model identifier. Raised before any network activity.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Tool errors (fallback path exhausted) ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our error.
pub type Result<T> = std::result::Result<T, PipelineError>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("Transport not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// The invoker could not map the detected signal onto a known tool.
    #[error("Tool call could not be resolved: {0}")]
    Unresolved(String),

    #[error("Tool invocation failed: {tool_name}: {reason}")]
    InvocationFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_displays_correctly() {
        let err = PipelineError::Transport(TransportError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = PipelineError::Tool(ToolError::InvocationFailed {
            tool_name: "lookup".into(),
            reason: "backend unreachable".into(),
        });
        assert!(err.to_string().contains("lookup"));
        assert!(err.to_string().contains("backend unreachable"));
    }

    #[test]
    fn precondition_error_displays_correctly() {
        let err = PipelineError::Precondition("Model ID is required".into());
        assert!(err.to_string().contains("Model ID is required"));
    }
}
