//! Dashboard error types

use thiserror::Error;

use crate::model::OperationKind;

/// How an error is handled by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Statistics fetch failed; retried on the next poll tick
    Transport,
    /// Purge or delete failed; never retried automatically
    Operation,
    /// Favorites storage unreadable or unwritable; recovered locally
    Persistence,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "TransportError",
            Self::Operation => "OperationError",
            Self::Persistence => "PersistenceError",
        }
    }

    /// Persistence problems are logged only, everything else reaches the operator
    pub fn surfaced_to_operator(&self) -> bool {
        !matches!(self, Self::Persistence)
    }
}

/// Failure of one statistics poll
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Statistics request failed with HTTP {status}")]
    Status { status: u16 },

    #[error("Statistics endpoint unreachable: {0}")]
    Transport(String),

    #[error("Malformed statistics response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Transport
    }
}

/// Failure of a purge or delete request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("Queue name must not be empty")]
    InvalidQueueName,

    #[error("Queue {name} is already {kind}")]
    InFlight { name: String, kind: OperationKind },

    #[error("Request failed: {status} {status_text} - {body}")]
    Rejected {
        status: u16,
        status_text: String,
        /// `<Code>` of an SQS XML error body, when the emulator sent one
        code: Option<String>,
        body: String,
    },

    #[error("Control endpoint unreachable: {0}")]
    Transport(String),
}

impl OperationError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Operation
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),
}

impl PersistenceError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Persistence
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
