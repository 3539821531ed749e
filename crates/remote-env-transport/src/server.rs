//! Serve master and worker implementations over TCP.

use std::{net::SocketAddr, sync::Arc};

use remote_env_core::{MasterService, RpcError, WorkerService};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};

use crate::protocol::{RpcRequest, RpcResponse, decode_frame, encode_frame};

/// Services exposed on one listener.
#[derive(Clone, Default)]
pub struct Services {
    master: Option<Arc<dyn MasterService>>,
    worker: Option<Arc<dyn WorkerService>>,
}

impl Services {
    /// Create an empty service set. Requests for missing services are
    /// answered with `UNIMPLEMENTED`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_master(mut self, master: impl MasterService + 'static) -> Self {
        self.master = Some(Arc::new(master));
        self
    }

    #[must_use]
    pub fn with_worker(mut self, worker: impl WorkerService + 'static) -> Self {
        self.worker = Some(Arc::new(worker));
        self
    }

    /// Handle one request.
    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        let result = match request {
            RpcRequest::StartGame(request) => match &self.master {
                Some(master) => master
                    .start_game(request)
                    .await
                    .map(RpcResponse::GameStarted),
                None => Err(unimplemented("master")),
            },
            RpcRequest::GetEnvResult(request) => match &self.worker {
                Some(worker) => worker
                    .get_env_result(&request)
                    .await
                    .map(|r| RpcResponse::env_result(&r)),
                None => Err(unimplemented("worker")),
            },
            RpcRequest::Step(request) => match &self.worker {
                Some(worker) => worker
                    .step(&request)
                    .await
                    .map(|r| RpcResponse::env_result(&r)),
                None => Err(unimplemented("worker")),
            },
        };
        result.unwrap_or_else(|e| RpcResponse::error(&e))
    }
}

fn unimplemented(service: &str) -> RpcError {
    RpcError::status(
        remote_env_core::StatusCode::Unimplemented,
        format!("No {service} service on this endpoint"),
    )
}

/// Accept connections forever, answering each request line with one
/// response line.
///
/// # Errors
/// Returns error if accepting a connection fails.
pub async fn serve(listener: TcpListener, services: Services) -> std::io::Result<()> {
    let services = Arc::new(services);
    loop {
        let (stream, peer) = listener.accept().await?;
        let services = Arc::clone(&services);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, &services).await {
                tracing::error!(%peer, "Connection error: {e}");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    services: &Services,
) -> Result<(), RpcError> {
    tracing::debug!(%peer, "Client connected");
    let (read, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match decode_frame::<RpcRequest>(&line) {
            Ok(request) => services.dispatch(request).await,
            Err(e) => {
                tracing::warn!(%peer, "Invalid request frame: {e}");
                RpcResponse::error(&RpcError::invalid_argument(e.to_string()))
            }
        };

        writer.write_all(encode_frame(&response)?.as_bytes()).await?;
        writer.flush().await?;
    }

    tracing::debug!(%peer, "Client disconnected");
    Ok(())
}
