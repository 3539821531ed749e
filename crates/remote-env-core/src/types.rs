//! Request and response messages exchanged with the master and workers.

use serde::{Deserialize, Serialize};

use crate::config::Credentials;

/// Session identifier issued by the master.
pub type SessionId = String;

/// Ask the master for a worker and a fresh session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGameRequest {
    pub game_version: String,
    pub username: String,
    pub token: String,
    pub model_name: String,
}

/// Worker assignment returned by the master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGameResponse {
    pub session_id: SessionId,
    pub worker_address: String,
}

/// Fetch the observation a new session starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialStateRequest {
    pub game_version: String,
    pub session_id: SessionId,
    pub username: String,
    pub token: String,
    pub model_name: String,
}

/// Advance the session by one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRequest {
    pub game_version: String,
    pub session_id: SessionId,
    pub username: String,
    pub token: String,
    pub action: u32,
    pub model_name: String,
}

/// Opaque serialized `(observation, reward, done, info)` returned by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvResultResponse {
    pub env_result: Vec<u8>,
}

impl StartGameRequest {
    #[must_use]
    pub fn new(game_version: &str, credentials: &Credentials) -> Self {
        Self {
            game_version: game_version.to_string(),
            username: credentials.username.clone(),
            token: credentials.token.clone(),
            model_name: credentials.model_name.clone(),
        }
    }
}

impl InitialStateRequest {
    #[must_use]
    pub fn new(game_version: &str, session_id: &str, credentials: &Credentials) -> Self {
        Self {
            game_version: game_version.to_string(),
            session_id: session_id.to_string(),
            username: credentials.username.clone(),
            token: credentials.token.clone(),
            model_name: credentials.model_name.clone(),
        }
    }
}

impl StepRequest {
    #[must_use]
    pub fn new(
        game_version: &str,
        session_id: &str,
        credentials: &Credentials,
        action: u32,
    ) -> Self {
        Self {
            game_version: game_version.to_string(),
            session_id: session_id.to_string(),
            username: credentials.username.clone(),
            token: credentials.token.clone(),
            action,
            model_name: credentials.model_name.clone(),
        }
    }
}

impl EnvResultResponse {
    #[must_use]
    pub const fn new(env_result: Vec<u8>) -> Self {
        Self { env_result }
    }
}
