//! TCP channels speaking the line-delimited JSON protocol.

use std::{net::SocketAddr, time::Duration};

use async_trait::async_trait;
use remote_env_core::{
    ChannelProvider, MasterService, RpcError, WorkerService,
    types::{EnvResultResponse, InitialStateRequest, StartGameRequest, StartGameResponse, StepRequest},
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream, lookup_host,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex,
};

use crate::protocol::{RpcRequest, RpcResponse, decode_frame, encode_frame};

/// Delay between connection attempts while waiting for a peer.
pub const DEFAULT_CONNECT_INTERVAL: Duration = Duration::from_millis(100);

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    fn new(stream: TcpStream) -> Self {
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    async fn roundtrip(&mut self, frame: &str) -> Result<RpcResponse, RpcError> {
        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.flush().await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(RpcError::unavailable("connection closed by peer"));
        }
        decode_frame(&line)
    }
}

/// Resolve `address` once, up front.
async fn resolve(address: &str) -> Result<Vec<SocketAddr>, RpcError> {
    let addrs: Vec<SocketAddr> = lookup_host(address).await?.collect();
    if addrs.is_empty() {
        return Err(RpcError::unavailable(format!(
            "{address} did not resolve to any address"
        )));
    }
    Ok(addrs)
}

async fn open_stream(addrs: &[SocketAddr]) -> std::io::Result<TcpStream> {
    let stream = TcpStream::connect(addrs).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

enum ChannelState {
    Connected(Connection),
    /// The last request failed at the socket level; reconnect on next use.
    Broken,
    Closed,
}

/// A single TCP connection carrying one request at a time.
///
/// A connection that fails mid-request is re-established transparently on
/// the next request, so retries by the caller reach a fresh socket.
pub struct TcpChannel {
    address: String,
    addrs: Vec<SocketAddr>,
    state: Mutex<ChannelState>,
}

impl TcpChannel {
    /// Connect, retrying every `interval` until the peer accepts.
    ///
    /// # Errors
    /// Returns error if the address cannot be parsed or resolved. Refused
    /// connections are retried; callers bound the wait with a timeout.
    pub async fn connect(address: &str, interval: Duration) -> Result<Self, RpcError> {
        let addrs = resolve(address).await?;
        loop {
            match open_stream(&addrs).await {
                Ok(stream) => {
                    tracing::debug!(%address, "Channel ready");
                    return Ok(Self {
                        address: address.to_string(),
                        addrs,
                        state: Mutex::new(ChannelState::Connected(Connection::new(stream))),
                    });
                }
                Err(e) => {
                    tracing::debug!(%address, error = %e, "Channel not ready yet");
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Send one request and wait for its response.
    ///
    /// # Errors
    /// Returns error if the channel is closed or the socket fails. Error
    /// frames from the peer are returned as `Ok(RpcResponse::Error { .. })`.
    pub async fn call(&self, request: &RpcRequest) -> Result<RpcResponse, RpcError> {
        let frame = encode_frame(request)?;
        let mut state = self.state.lock().await;

        if matches!(*state, ChannelState::Broken) {
            let stream = open_stream(&self.addrs).await?;
            tracing::debug!(address = %self.address, "Reconnected");
            *state = ChannelState::Connected(Connection::new(stream));
        }
        let ChannelState::Connected(conn) = &mut *state else {
            return Err(RpcError::ChannelClosed);
        };

        // Error frames arrive as `Ok`; any `Err` here leaves the stream unusable.
        let result = conn.roundtrip(&frame).await;
        if result.is_err() {
            *state = ChannelState::Broken;
        }
        result
    }

    /// Shut the socket down. Closing twice is a no-op.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if let ChannelState::Connected(conn) = &mut *state {
            if let Err(e) = conn.writer.shutdown().await {
                tracing::debug!(address = %self.address, error = %e, "Shutdown failed");
            }
        }
        *state = ChannelState::Closed;
    }
}

/// Master channel over TCP.
pub struct TcpMasterClient(TcpChannel);

/// Worker channel over TCP.
pub struct TcpWorkerClient(TcpChannel);

impl TcpMasterClient {
    #[must_use]
    pub const fn channel(&self) -> &TcpChannel {
        &self.0
    }
}

impl TcpWorkerClient {
    #[must_use]
    pub const fn channel(&self) -> &TcpChannel {
        &self.0
    }
}

#[async_trait]
impl MasterService for TcpMasterClient {
    async fn start_game(&self, request: StartGameRequest) -> Result<StartGameResponse, RpcError> {
        self.0
            .call(&RpcRequest::StartGame(request))
            .await?
            .into_game_started()
    }

    async fn close(&self) {
        self.0.shutdown().await;
    }
}

#[async_trait]
impl WorkerService for TcpWorkerClient {
    async fn get_env_result(
        &self,
        request: &InitialStateRequest,
    ) -> Result<EnvResultResponse, RpcError> {
        self.0
            .call(&RpcRequest::GetEnvResult(request.clone()))
            .await?
            .into_env_result()
    }

    async fn step(&self, request: &StepRequest) -> Result<EnvResultResponse, RpcError> {
        self.0
            .call(&RpcRequest::Step(request.clone()))
            .await?
            .into_env_result()
    }

    async fn close(&self) {
        self.0.shutdown().await;
    }
}

/// Opens TCP channels to masters and workers.
#[derive(Debug, Clone, Copy)]
pub struct TcpChannelProvider {
    connect_interval: Duration,
}

impl Default for TcpChannelProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_INTERVAL)
    }
}

impl TcpChannelProvider {
    #[must_use]
    pub const fn new(connect_interval: Duration) -> Self {
        Self { connect_interval }
    }
}

#[async_trait]
impl ChannelProvider for TcpChannelProvider {
    type Master = TcpMasterClient;
    type Worker = TcpWorkerClient;

    async fn connect_master(&self, address: &str) -> Result<TcpMasterClient, RpcError> {
        TcpChannel::connect(address, self.connect_interval)
            .await
            .map(TcpMasterClient)
    }

    async fn connect_worker(&self, address: &str) -> Result<TcpWorkerClient, RpcError> {
        TcpChannel::connect(address, self.connect_interval)
            .await
            .map(TcpWorkerClient)
    }
}
