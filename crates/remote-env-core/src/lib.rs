//! Core abstractions for remote simulation sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `ClientConfig` - Credentials, track and endpoint resolution
//! - `StepOutcome` - Decoded `(observation, reward, done, info)` results
//! - `ActionSpace` - The discrete action set exposed to agents
//! - `RpcError` - Status-coded transport failures
//! - Master/worker service and channel provider traits

pub mod action;
pub mod config;
pub mod error;
pub mod outcome;
pub mod traits;
pub mod types;
pub mod wrapper;

pub use action::{Action, ActionSpace};
pub use config::{ClientConfig, Credentials, MasterDirectory};
pub use error::{RpcError, StatusCode};
pub use outcome::StepOutcome;
pub use traits::{ChannelProvider, MasterService, WorkerService};
pub use wrapper::{RemoteWrapperConfig, WrapperConfig};
