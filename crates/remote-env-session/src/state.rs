//! Idle/Active session record.

use remote_env_core::{WorkerService, types::SessionId};

/// The client's current session.
///
/// A session id and a worker channel only ever exist together.
#[derive(Debug)]
pub enum SessionState<W> {
    /// No session; `step` is not allowed.
    Idle,
    /// A session assigned by the master, reachable through `worker`.
    Active { session_id: SessionId, worker: W },
}

impl<W> Default for SessionState<W> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<W> SessionState<W> {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Active { session_id, .. } => Some(session_id),
            Self::Idle => None,
        }
    }

    #[must_use]
    pub const fn worker(&self) -> Option<&W> {
        match self {
            Self::Active { worker, .. } => Some(worker),
            Self::Idle => None,
        }
    }

    /// Session id and worker of the active session.
    #[must_use]
    pub fn active(&self) -> Option<(&str, &W)> {
        match self {
            Self::Active { session_id, worker } => Some((session_id, worker)),
            Self::Idle => None,
        }
    }

    /// Enter the Active phase, returning whatever session was replaced.
    pub fn activate(&mut self, session_id: SessionId, worker: W) -> Option<(SessionId, W)> {
        std::mem::replace(self, Self::Active { session_id, worker }).into_parts()
    }

    /// Return to Idle, handing back the session that was active.
    pub fn take(&mut self) -> Option<(SessionId, W)> {
        std::mem::take(self).into_parts()
    }

    fn into_parts(self) -> Option<(SessionId, W)> {
        match self {
            Self::Active { session_id, worker } => Some((session_id, worker)),
            Self::Idle => None,
        }
    }
}

impl<W: WorkerService> SessionState<W> {
    /// Close the worker channel and return to Idle.
    ///
    /// Returns the id of the released session; releasing an Idle state is a
    /// no-op.
    pub async fn release(&mut self) -> Option<SessionId> {
        let (session_id, worker) = self.take()?;
        worker.close().await;
        tracing::debug!(%session_id, "Released worker channel");
        Some(session_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use remote_env_core::{
        RpcError,
        types::{EnvResultResponse, InitialStateRequest, StepRequest},
    };

    use super::*;

    #[derive(Default)]
    struct CountingWorker {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl WorkerService for CountingWorker {
        async fn get_env_result(
            &self,
            _request: &InitialStateRequest,
        ) -> Result<EnvResultResponse, RpcError> {
            Err(RpcError::ChannelClosed)
        }

        async fn step(&self, _request: &StepRequest) -> Result<EnvResultResponse, RpcError> {
            Err(RpcError::ChannelClosed)
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_starts_idle() {
        let state = SessionState::<CountingWorker>::default();
        assert!(!state.is_active());
        assert_eq!(state.session_id(), None);
        assert!(state.worker().is_none());
    }

    #[test]
    fn test_activate_and_take() {
        let mut state = SessionState::default();
        assert!(state.activate("g1".to_string(), CountingWorker::default()).is_none());
        assert!(state.is_active());
        assert_eq!(state.session_id(), Some("g1"));
        assert!(state.active().is_some());

        let replaced = state.activate("g2".to_string(), CountingWorker::default());
        assert_eq!(replaced.map(|(id, _)| id).as_deref(), Some("g1"));
        assert_eq!(state.session_id(), Some("g2"));

        assert!(state.take().is_some());
        assert!(!state.is_active());
        assert!(state.take().is_none());
    }

    #[tokio::test]
    async fn test_release_closes_worker_once() {
        let closed = Arc::new(AtomicUsize::new(0));
        let mut state = SessionState::default();
        state.activate(
            "g1".to_string(),
            CountingWorker {
                closed: Arc::clone(&closed),
            },
        );

        assert_eq!(state.release().await.as_deref(), Some("g1"));
        assert_eq!(state.release().await, None);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(!state.is_active());
    }
}
