//! Session client for a remote simulation service.

use std::{fmt, future::Future, time::Duration};

use remote_env_core::{
    ActionSpace, ChannelProvider, ClientConfig, Credentials, MasterService, RemoteWrapperConfig,
    RpcError, StepOutcome, WorkerService,
    outcome::Observation,
    types::{EnvResultResponse, InitialStateRequest, StartGameRequest, StepRequest},
};

use crate::{
    error::{EnvError, UsageError},
    retry::RetryExecutor,
    state::SessionState,
};

/// Client exposing `reset`/`step` over a master and per-session workers.
///
/// `reset` asks the master for a worker and a session, `step` talks to that
/// worker. A result with `done` set ends the session; the next `step` then
/// requires another `reset`.
pub struct RemoteEnv<P: ChannelProvider> {
    provider: P,
    config: ClientConfig,
    credentials: Credentials,
    action_space: ActionSpace,
    retry: RetryExecutor,
    master: P::Master,
    state: SessionState<P::Worker>,
}

impl<P: ChannelProvider> fmt::Debug for RemoteEnv<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Credentials stay out of debug output.
        f.debug_struct("RemoteEnv")
            .field("username", &self.config.username)
            .field("track", &self.config.track)
            .field("game_version", &self.config.game_version)
            .field("session_id", &self.state.session_id())
            .finish_non_exhaustive()
    }
}

impl<P: ChannelProvider> RemoteEnv<P> {
    /// Connect to the master of the configured track.
    ///
    /// # Errors
    /// Returns error if the track has no master address or the master
    /// channel does not become ready.
    pub async fn connect(config: ClientConfig, provider: P) -> Result<Self, EnvError> {
        let address = config.master_address_for_track()?.to_string();
        tracing::info!(%address, track = %config.track, "Connecting to master");
        let master = wait_ready(
            &address,
            config.ready_timeout_duration(),
            provider.connect_master(&address),
        )
        .await?;

        Ok(Self {
            credentials: config.credentials(),
            action_space: ActionSpace::default(),
            retry: RetryExecutor::new(config.retry),
            provider,
            config,
            master,
            state: SessionState::default(),
        })
    }

    #[must_use]
    pub const fn action_space(&self) -> ActionSpace {
        self.action_space
    }

    /// Configuration surface for environment wrappers.
    #[must_use]
    pub const fn wrapper_config(&self) -> RemoteWrapperConfig {
        RemoteWrapperConfig
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.state.session_id()
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Start a new session and return its initial observation.
    ///
    /// An active session is forfeited first: its worker channel is closed
    /// without notifying the server.
    ///
    /// # Errors
    /// Returns error if the master rejects the request, the worker cannot be
    /// reached, or the initial state fetch fails.
    pub async fn reset(&mut self) -> Result<Observation, EnvError> {
        if let Some(session_id) = self.state.release().await {
            tracing::info!(%session_id, "Surrendering current game");
        }

        let request = StartGameRequest::new(&self.config.game_version, &self.credentials);
        let assignment = self
            .master
            .start_game(request)
            .await
            .map_err(EnvError::Master)?;
        tracing::info!(
            session_id = %assignment.session_id,
            worker = %assignment.worker_address,
            "Game assigned"
        );

        let worker = wait_ready(
            &assignment.worker_address,
            self.config.ready_timeout_duration(),
            self.provider.connect_worker(&assignment.worker_address),
        )
        .await?;

        let request = InitialStateRequest::new(
            &self.config.game_version,
            &assignment.session_id,
            &self.credentials,
        );
        let fetched = self
            .retry
            .execute("GetEnvResult", || worker.get_env_result(&request))
            .await
            .map_err(EnvError::from)
            .and_then(|response| {
                StepOutcome::decode(&response.env_result).map_err(EnvError::from)
            });
        let outcome = match fetched {
            Ok(outcome) => outcome,
            Err(e) => {
                worker.close().await;
                return Err(e);
            }
        };

        self.state.activate(assignment.session_id, worker);
        Ok(self.process_outcome(outcome).await.observation)
    }

    /// Apply one action to the active session.
    ///
    /// # Errors
    /// Returns `UsageError` without any network traffic if no session is
    /// active or the action is out of range; otherwise returns the fatal or
    /// exhausted-retries error of the step request.
    pub async fn step(&mut self, action: i64) -> Result<StepOutcome, EnvError> {
        let Some((session_id, worker)) = self.state.active() else {
            return Err(UsageError::NotReset.into());
        };
        let action = self
            .action_space
            .index(action)
            .ok_or(UsageError::BadAction {
                action,
                num_actions: self.action_space.n,
            })?;

        let request = StepRequest::new(
            &self.config.game_version,
            session_id,
            &self.credentials,
            action,
        );
        let response: EnvResultResponse = self
            .retry
            .execute("Step", || worker.step(&request))
            .await?;

        let outcome = StepOutcome::decode(&response.env_result)?;
        Ok(self.process_outcome(outcome).await)
    }

    /// Release the worker and master channels.
    pub async fn close(&mut self) {
        if let Some(session_id) = self.state.release().await {
            tracing::info!(%session_id, "Closing with game in progress");
        }
        self.master.close().await;
    }

    async fn process_outcome(&mut self, outcome: StepOutcome) -> StepOutcome {
        if outcome.done {
            if let Some(session_id) = self.state.release().await {
                tracing::info!(%session_id, reward = outcome.reward, "Game finished");
            }
        }
        outcome
    }
}

/// Await a channel, bounded by `timeout` when one is configured.
async fn wait_ready<T>(
    address: &str,
    timeout: Option<Duration>,
    connect: impl Future<Output = Result<T, RpcError>>,
) -> Result<T, EnvError> {
    let connected = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| EnvError::ReadyTimeout {
                address: address.to_string(),
                timeout,
            })?,
        None => connect.await,
    };

    connected.map_err(|source| EnvError::Connect {
        address: address.to_string(),
        source,
    })
}
