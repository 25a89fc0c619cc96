//! Error types for the agentloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; callers wrap the ones they
//! can hit (see `AgentError`).

use thiserror::Error;

// --- Bounded context errors ---

/// Failures talking to the completion endpoint.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with something that is neither a final answer
    /// nor a tool-use request. `raw` carries the offending payload.
    #[error("Unrecognized completion shape: {raw}")]
    ProtocolViolation { raw: String },
}

impl ProviderError {
    /// Whether the failure is worth retrying (timeouts, rate limits, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 408,
            Self::AuthenticationFailed(_) | Self::NotConfigured(_) | Self::ProtocolViolation { .. } => {
                false
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Role sequence violation: {attempted} cannot follow {previous}")]
    RoleSequence { previous: String, attempted: String },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {name} (available: {})", available.join(", "))]
    NotFound { name: String, available: Vec<String> },

    #[error("Invalid tool definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn not_found_lists_available_tools() {
        let err = ToolError::NotFound {
            name: "teleport".into(),
            available: vec!["calculator".into(), "current_time".into()],
        };
        let text = err.to_string();
        assert!(text.contains("teleport"));
        assert!(text.contains("calculator, current_time"));
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::RateLimited { retry_after_secs: 1 }.is_transient());
        assert!(ProviderError::Timeout("slow".into()).is_transient());
        assert!(ProviderError::Network("reset".into()).is_transient());
        assert!(
            ProviderError::ApiError { status_code: 503, message: String::new() }.is_transient()
        );
        assert!(
            !ProviderError::ApiError { status_code: 400, message: String::new() }.is_transient()
        );
        assert!(!ProviderError::AuthenticationFailed("bad key".into()).is_transient());
        assert!(!ProviderError::ProtocolViolation { raw: "{}".into() }.is_transient());
    }
}
