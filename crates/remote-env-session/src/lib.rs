//! Session lifecycle and resilient request execution for remote simulations.
//!
//! Provides:
//! - `RemoteEnv` - reset/step client over a master and per-session workers
//! - `RetryExecutor` - bounded retries with exponential backoff
//! - `SessionState` - the Idle/Active session record

pub mod client;
pub mod error;
pub mod retry;
pub mod state;

pub use client::RemoteEnv;
pub use error::{EnvError, UsageError};
pub use retry::{RetryError, RetryExecutor};
pub use state::SessionState;
