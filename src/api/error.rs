//! Errors surfaced by API operations.
//!
//! Every variant renders as a single human-readable sentence; callers show
//! `to_string()` and need nothing else.

use thiserror::Error;

/// Errors that can occur while talking to the grievance service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    InvalidInput(String),

    /// Login refused (401).
    #[error("{0}")]
    InvalidCredentials(String),

    /// Registration conflict (409).
    #[error("User already exists")]
    UserExists,

    /// The stored credential was rejected and has been discarded.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// Any other non-success response.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// No response was obtained, even after retries.
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response did not have the expected shape.
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status behind the error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::InvalidCredentials(_) => Some(401),
            ClientError::UserExists => Some(409),
            ClientError::SessionExpired => Some(401),
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
