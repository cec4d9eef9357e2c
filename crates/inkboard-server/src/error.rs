//! Relay error types.

use inkboard_core::ProtocolError;
use thiserror::Error;

/// Errors raised while serving connections.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Invalid payload for {kind}: {reason}")]
    InvalidPayload { kind: String, reason: &'static str },
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] axum::Error),
}

impl RelayError {
    pub fn invalid_payload(kind: &str, reason: &'static str) -> Self {
        Self::InvalidPayload {
            kind: kind.to_string(),
            reason,
        }
    }
}
