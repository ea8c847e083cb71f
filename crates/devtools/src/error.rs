//! Error types for discovery, CDP calls and cookie files
//!
//! Flat hierarchy. Callers match on the variant to decide whether a failure
//! aborts the whole operation or only the item being processed.

use thiserror::Error;

use crate::cdp::protocol::RequestId;

pub type Result<T> = std::result::Result<T, CDPError>;

#[derive(Debug, Error)]
pub enum CDPError {
    /// HTTP discovery failed: connection refused, non-2xx, malformed body.
    #[error("Target discovery failed at {endpoint}: {reason}")]
    Network { endpoint: String, reason: String },

    #[error("No usable target: {0}")]
    TargetNotFound(String),

    /// WebSocket handshake or connect failed.
    #[error("Connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    /// The browser answered the call with an error reply.
    #[error("CDP protocol error: {code} - {message}")]
    Protocol { code: i32, message: String },

    #[error("Malformed CDP frame: {0}")]
    MalformedFrame(String),

    #[error("Reply with id {0} matches no outstanding request")]
    UnexpectedReply(RequestId),

    #[error("Invalid {method} response: {reason}")]
    InvalidResponse { method: String, reason: String },

    #[error("Invalid cookie data: {0}")]
    Validation(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed")]
    Closed,

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CDPError {
    /// Errors raised by the remote end of an established session.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            CDPError::Protocol { .. }
                | CDPError::MalformedFrame(_)
                | CDPError::UnexpectedReply(_)
                | CDPError::InvalidResponse { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CDPError::Timeout(_))
    }

    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        CDPError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
