use std::time::Duration;

use thiserror::Error;

/// Reasons a single streaming session stopped before the remote end closed.
///
/// None of these abort the run. The orchestrator records them per session and
/// keeps every other session going.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("failed to connect: {0}")]
    ConnectFailure(String),
    #[error("unexpected HTTP status {status}")]
    UnexpectedStatus { status: u16 },
    #[error("malformed container header: {0}")]
    MalformedHeader(String),
    #[error("error reading stream: {0}")]
    ReadFailure(String),
    #[error("no data received within {0:?}")]
    ReadTimeout(Duration),
    #[error("stop signal observed")]
    Cancelled,
}

impl SessionError {
    pub fn connect(error: reqwest::Error) -> Self {
        Self::ConnectFailure(error.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled)
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            SessionError::UnexpectedStatus { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(error: std::io::Error) -> Self {
        Self::ReadFailure(error.to_string())
    }
}
