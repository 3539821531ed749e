//! Errors surfaced by the session client.

use std::time::Duration;

use remote_env_core::{
    RpcError, StatusCode,
    error::{ConfigError, DecodeError},
};
use thiserror::Error;

use crate::retry::RetryError;

/// The caller used the client incorrectly. Never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Environment should be reset!")]
    NotReset,
    #[error("Bad action number: {action} (valid range is 0..{num_actions})")]
    BadAction { action: i64, num_actions: u32 },
}

/// Session client error.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// The worker rejected the request as invalid or out of sequence.
    #[error("Fatal RPC error: {0}")]
    Rpc(RpcError),
    /// Every attempt of a worker request failed.
    #[error("Connection problems: {rpc} failed after {attempts} attempts")]
    ConnectionProblems { rpc: String, attempts: u32 },
    /// The master request failed. Master requests are not retried.
    #[error("Master request failed: {0}")]
    Master(RpcError),
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: RpcError,
    },
    #[error("Timed out after {timeout:?} waiting for {address} to become ready")]
    ReadyTimeout { address: String, timeout: Duration },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<RetryError> for EnvError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Fatal(e) => Self::Rpc(e),
            RetryError::Exhausted { rpc, attempts } => Self::ConnectionProblems { rpc, attempts },
        }
    }
}

impl EnvError {
    /// Status code of the underlying RPC failure, if any.
    #[must_use]
    pub const fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Rpc(e) | Self::Master(e) | Self::Connect { source: e, .. } => e.code(),
            _ => None,
        }
    }
}
