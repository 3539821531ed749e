//! Core traits for the master/worker services and the channels that reach them.

use async_trait::async_trait;

use crate::{
    error::RpcError,
    types::{EnvResultResponse, InitialStateRequest, StartGameRequest, StartGameResponse, StepRequest},
};

/// Service that assigns workers and issues session ids.
#[async_trait]
pub trait MasterService: Send + Sync {
    /// Start a new game and return the assigned worker.
    async fn start_game(&self, request: StartGameRequest) -> Result<StartGameResponse, RpcError>;

    /// Release the underlying channel. Closing twice is a no-op.
    async fn close(&self) {}
}

/// Service executing simulation steps for a session.
#[async_trait]
pub trait WorkerService: Send + Sync {
    /// Fetch the initial result of a freshly assigned session.
    async fn get_env_result(
        &self,
        request: &InitialStateRequest,
    ) -> Result<EnvResultResponse, RpcError>;

    /// Apply one action.
    async fn step(&self, request: &StepRequest) -> Result<EnvResultResponse, RpcError>;

    /// Release the underlying channel. Closing twice is a no-op.
    async fn close(&self) {}
}

/// Opens ready-to-use channels to master and worker addresses.
///
/// Both methods only return once the channel is ready; callers bound the
/// wait with their own timeout.
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    type Master: MasterService;
    type Worker: WorkerService;

    /// Open a channel to a master.
    async fn connect_master(&self, address: &str) -> Result<Self::Master, RpcError>;

    /// Open a channel to a worker.
    async fn connect_worker(&self, address: &str) -> Result<Self::Worker, RpcError>;
}

#[async_trait]
impl<T: MasterService + ?Sized> MasterService for std::sync::Arc<T> {
    async fn start_game(&self, request: StartGameRequest) -> Result<StartGameResponse, RpcError> {
        (**self).start_game(request).await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}

#[async_trait]
impl<T: WorkerService + ?Sized> WorkerService for std::sync::Arc<T> {
    async fn get_env_result(
        &self,
        request: &InitialStateRequest,
    ) -> Result<EnvResultResponse, RpcError> {
        (**self).get_env_result(request).await
    }

    async fn step(&self, request: &StepRequest) -> Result<EnvResultResponse, RpcError> {
        (**self).step(request).await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}
