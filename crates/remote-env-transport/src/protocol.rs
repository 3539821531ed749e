//! Wire protocol for master and worker channels.
//!
//! Every frame is one JSON object on its own line. Result payloads are
//! opaque bytes and travel base64 encoded.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use remote_env_core::{
    RpcError, StatusCode,
    types::{EnvResultResponse, InitialStateRequest, StartGameRequest, StartGameResponse, StepRequest},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Request frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RpcRequest {
    StartGame(StartGameRequest),
    GetEnvResult(InitialStateRequest),
    Step(StepRequest),
}

/// Response frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RpcResponse {
    /// Master assignment.
    GameStarted(StartGameResponse),
    /// Worker result (base64 encoded).
    EnvResult { env_result: String },
    /// Failed request.
    Error { code: StatusCode, message: String },
}

impl RpcResponse {
    /// Create a result frame from a worker response.
    #[must_use]
    pub fn env_result(response: &EnvResultResponse) -> Self {
        Self::EnvResult {
            env_result: BASE64.encode(&response.env_result),
        }
    }

    /// Create an error frame.
    ///
    /// Local transport failures are reported as `UNAVAILABLE`.
    #[must_use]
    pub fn error(err: &RpcError) -> Self {
        match err {
            RpcError::Status { code, message } => Self::Error {
                code: *code,
                message: message.clone(),
            },
            other => Self::Error {
                code: StatusCode::Unavailable,
                message: other.to_string(),
            },
        }
    }

    /// Interpret as a master assignment.
    ///
    /// # Errors
    /// Returns the carried error, or a frame error for an unexpected frame.
    pub fn into_game_started(self) -> Result<StartGameResponse, RpcError> {
        match self {
            Self::GameStarted(response) => Ok(response),
            Self::Error { code, message } => Err(RpcError::Status { code, message }),
            Self::EnvResult { .. } => Err(RpcError::Frame(
                "expected game_started, got env_result".to_string(),
            )),
        }
    }

    /// Interpret as a worker result.
    ///
    /// # Errors
    /// Returns the carried error, or a frame error for an unexpected frame or
    /// invalid base64.
    pub fn into_env_result(self) -> Result<EnvResultResponse, RpcError> {
        match self {
            Self::EnvResult { env_result } => BASE64
                .decode(env_result)
                .map(EnvResultResponse::new)
                .map_err(|e| RpcError::Frame(format!("invalid env_result encoding: {e}"))),
            Self::Error { code, message } => Err(RpcError::Status { code, message }),
            Self::GameStarted(_) => Err(RpcError::Frame(
                "expected env_result, got game_started".to_string(),
            )),
        }
    }
}

/// Serialize a frame, including the trailing newline.
///
/// # Errors
/// Returns error if the frame cannot be serialized.
pub fn encode_frame<T: Serialize>(frame: &T) -> Result<String, RpcError> {
    let mut line = serde_json::to_string(frame).map_err(|e| RpcError::Frame(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

/// Parse one frame.
///
/// # Errors
/// Returns error if the line is not a valid frame.
pub fn decode_frame<T: DeserializeOwned>(line: &str) -> Result<T, RpcError> {
    serde_json::from_str(line.trim()).map_err(|e| RpcError::Frame(e.to_string()))
}
