//! Errors a loop call can end with.

use agentloop_core::{MemoryError, ProviderError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The endpoint failed (after any retries).
    #[error(transparent)]
    Endpoint(ProviderError),

    /// The endpoint answered with an unrecognized shape; `raw` is that shape.
    #[error("Unrecognized completion shape: {raw}")]
    ProtocolViolation { raw: String },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

impl From<ProviderError> for AgentError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::ProtocolViolation { raw } => AgentError::ProtocolViolation { raw },
            other => AgentError::Endpoint(other),
        }
    }
}

impl AgentError {
    /// The text shown to a user in place of an answer.
    ///
    /// Protocol violations surface the raw shape as-is; everything else
    /// gets the `Error processing request:` prefix.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::ProtocolViolation { raw } => raw.clone(),
            other => format!("Error processing request: {other}"),
        }
    }
}
