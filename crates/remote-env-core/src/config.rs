//! Client configuration.
//!
//! Everything the session client needs is passed in explicitly: there is no
//! process-wide game version or endpoint lookup.

use std::{collections::HashMap, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Game version sent with every request unless overridden.
pub const DEFAULT_GAME_VERSION: &str = "v2.3";

/// Track used when none is configured.
pub const DEFAULT_TRACK: &str = "default";

/// Master address registered for the default track.
pub const DEFAULT_MASTER_ADDRESS: &str = "127.0.0.1:50051";

/// Attempts made by the retry executor before giving up.
pub const CONNECTION_TRIALS: u32 = 20;

/// Identity attached to every outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub token: String,
    #[serde(default)]
    pub model_name: String,
}

impl Credentials {
    /// Create credentials with an empty model name.
    #[must_use]
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            model_name: String::new(),
        }
    }

    #[must_use]
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }
}

/// Track name to master address mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasterDirectory {
    addresses: HashMap<String, String>,
}

impl Default for MasterDirectory {
    fn default() -> Self {
        let mut addresses = HashMap::new();
        addresses.insert(DEFAULT_TRACK.to_string(), DEFAULT_MASTER_ADDRESS.to_string());
        Self { addresses }
    }
}

impl MasterDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            addresses: HashMap::new(),
        }
    }

    /// Register (or replace) the master address of a track.
    pub fn insert(&mut self, track: impl Into<String>, address: impl Into<String>) {
        self.addresses.insert(track.into(), address.into());
    }

    /// Resolve the master address for a track.
    ///
    /// # Errors
    /// Returns error if no address is registered for the track.
    pub fn resolve(&self, track: &str) -> Result<&str, ConfigError> {
        self.addresses
            .get(track)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnknownTrack(track.to_string()))
    }
}

/// Retry executor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: CONNECTION_TRIALS,
            initial_delay_ms: 1_000,
            max_delay_ms: 1_000_000,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

fn default_model_name() -> String {
    String::new()
}

fn default_track() -> String {
    DEFAULT_TRACK.to_string()
}

fn default_game_version() -> String {
    DEFAULT_GAME_VERSION.to_string()
}

/// Construction-time configuration of a session client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub username: String,
    pub token: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Selects which master endpoint to address.
    #[serde(default = "default_track")]
    pub track: String,
    #[serde(default = "default_game_version")]
    pub game_version: String,
    /// Upper bound on waiting for a channel to become ready.
    /// `None` waits indefinitely.
    #[serde(default)]
    pub ready_timeout_ms: Option<u64>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub master_addresses: MasterDirectory,
}

impl ClientConfig {
    /// Create a config for the default track.
    #[must_use]
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            model_name: default_model_name(),
            track: default_track(),
            game_version: default_game_version(),
            ready_timeout_ms: None,
            retry: RetryConfig::default(),
            master_addresses: MasterDirectory::default(),
        }
    }

    #[must_use]
    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    #[must_use]
    pub fn track(mut self, track: impl Into<String>) -> Self {
        self.track = track.into();
        self
    }

    #[must_use]
    pub fn game_version(mut self, game_version: impl Into<String>) -> Self {
        self.game_version = game_version.into();
        self
    }

    #[must_use]
    pub fn ready_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ready_timeout_ms =
            timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Register the master address for a track.
    #[must_use]
    pub fn master_address(mut self, track: impl Into<String>, address: impl Into<String>) -> Self {
        self.master_addresses.insert(track, address);
        self
    }

    /// Credentials derived from this config.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            token: self.token.clone(),
            model_name: self.model_name.clone(),
        }
    }

    #[must_use]
    pub fn ready_timeout_duration(&self) -> Option<Duration> {
        self.ready_timeout_ms.map(Duration::from_millis)
    }

    /// Master address for the configured track.
    ///
    /// # Errors
    /// Returns error if the track has no registered master.
    pub fn master_address_for_track(&self) -> Result<&str, ConfigError> {
        self.master_addresses.resolve(&self.track)
    }

    /// Load a config from a JSON file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load a config from `REMOTE_ENV_*` environment variables.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Build a config from `(key, value)` pairs using the `REMOTE_ENV_*` names.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or malformed.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(k, _)| k.as_ref().starts_with("REMOTE_ENV_"))
            .map(|(k, v)| (k.as_ref().to_string(), v.into()))
            .collect();

        let username = vars
            .get("REMOTE_ENV_USERNAME")
            .ok_or(ConfigError::Missing("REMOTE_ENV_USERNAME"))?;
        let token = vars
            .get("REMOTE_ENV_TOKEN")
            .ok_or(ConfigError::Missing("REMOTE_ENV_TOKEN"))?;

        let mut config = Self::new(username.as_str(), token.as_str());
        if let Some(model_name) = vars.get("REMOTE_ENV_MODEL_NAME") {
            config.model_name.clone_from(model_name);
        }
        if let Some(track) = vars.get("REMOTE_ENV_TRACK") {
            config.track.clone_from(track);
        }
        if let Some(game_version) = vars.get("REMOTE_ENV_GAME_VERSION") {
            config.game_version.clone_from(game_version);
        }
        if let Some(address) = vars.get("REMOTE_ENV_MASTER_ADDRESS") {
            let track = config.track.clone();
            config.master_addresses.insert(track, address.as_str());
        }
        if let Some(raw) = vars.get("REMOTE_ENV_READY_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "REMOTE_ENV_READY_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
            config.ready_timeout_ms = Some(secs.saturating_mul(1_000));
        }
        Ok(config)
    }
}
