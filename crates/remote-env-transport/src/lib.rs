//! Channels to remote simulation masters and workers.
//!
//! Provides:
//! - Wire protocol (line-delimited JSON, base64 result payloads)
//! - TCP channels and a server adapter (feature: tcp)
//! - In-memory master and workers (feature: memory)

pub mod protocol;

#[cfg(feature = "tcp")]
pub mod server;

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(feature = "memory")]
pub mod memory;

pub use protocol::{RpcRequest, RpcResponse};

#[cfg(feature = "tcp")]
pub use server::{Services, serve};

#[cfg(feature = "tcp")]
pub use tcp::{TcpChannelProvider, TcpMasterClient, TcpWorkerClient};

#[cfg(feature = "memory")]
pub use memory::{MemoryEvent, MemoryProvider};
