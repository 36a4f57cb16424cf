//! Error types for reliserve.

use thiserror::Error;

use crate::model::Status;

#[derive(Debug, Error)]
pub enum Error {
    #[error("job not found: {0}")]
    NotFound(String),

    /// Actor is authenticated but not permitted for this transition.
    /// Retrying with the same actor never succeeds.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The claim guard matched zero rows: the job was not OPEN at the
    /// moment of the attempt.
    #[error("job already taken")]
    AlreadyTaken,

    /// Status precondition not met at write time. The caller should
    /// refresh, not retry blindly.
    #[error("cannot {action} job in status {current}")]
    WrongStatus {
        action: &'static str,
        current: Status,
    },

    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: String,
    },

    /// Credentials could not be resolved to an actor.
    #[error("authentication failed")]
    Unauthorized,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

/// Stable outcome classes for adapting layers (HTTP, RPC). "Not found",
/// "forbidden" and "conflict" must stay distinct signals at any boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    Validation,
    Unauthorized,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::AlreadyTaken | Error::WrongStatus { .. } => ErrorKind::Conflict,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Unauthorized => ErrorKind::Unauthorized,
            Error::Config(_) | Error::Storage(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
