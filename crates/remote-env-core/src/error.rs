//! Transport error taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status code reported by a remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Cancelled,
    Unknown,
    /// The request itself was malformed (e.g. a bad action).
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    /// The server cannot execute the request in its current state
    /// (e.g. a stale or unknown session).
    FailedPrecondition,
    Aborted,
    Unimplemented,
    Internal,
    Unavailable,
    Unauthenticated,
}

impl StatusCode {
    /// Whether a failure with this code must never be retried.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::InvalidArgument | Self::FailedPrecondition)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a single RPC attempt.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The remote service answered with a non-OK status.
    #[error("RPC failed with {code}: {message}")]
    Status { code: StatusCode, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Channel closed")]
    ChannelClosed,
    #[error("Malformed frame: {0}")]
    Frame(String),
}

impl RpcError {
    /// Create a status error.
    #[must_use]
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::status(StatusCode::InvalidArgument, message)
    }

    #[must_use]
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::status(StatusCode::FailedPrecondition, message)
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::status(StatusCode::Unavailable, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::status(StatusCode::Internal, message)
    }

    /// Status code carried by this error, if the remote side reported one.
    #[must_use]
    pub const fn code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Fatal errors are propagated immediately; everything else is retryable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.code().is_some_and(StatusCode::is_fatal)
    }
}

/// Error decoding an opaque result payload.
#[derive(Debug, Error)]
#[error("Failed to decode env result: {0}")]
pub struct DecodeError(#[from] pub serde_json::Error);

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No master address configured for track '{0}'")]
    UnknownTrack(String),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
