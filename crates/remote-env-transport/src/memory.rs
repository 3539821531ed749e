//! In-memory master and workers.
//!
//! Useful for development and tests: every channel opened through a
//! `MemoryProvider` shares one simulated service, which records each request
//! and can be scripted with assignments, results and failures.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use remote_env_core::{
    ChannelProvider, MasterService, RpcError, StepOutcome, WorkerService,
    action::DEFAULT_ACTION_SET,
    outcome::Info,
    types::{
        EnvResultResponse, InitialStateRequest, SessionId, StartGameRequest, StartGameResponse,
        StepRequest,
    },
};
use serde_json::json;
use uuid::Uuid;

/// Steps after which the built-in simulation reports `done`.
pub const DEFAULT_EPISODE_LENGTH: u64 = 3000;

/// Something observable that happened on an in-memory channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryEvent {
    MasterOpened(String),
    MasterClosed(String),
    StartGame(StartGameRequest),
    WorkerOpened(String),
    WorkerClosed(String),
    GetEnvResult(InitialStateRequest),
    Step(StepRequest),
}

struct Shared {
    assignments: VecDeque<StartGameResponse>,
    master_failures: VecDeque<RpcError>,
    worker_replies: VecDeque<Result<StepOutcome, RpcError>>,
    unreachable: HashSet<String>,
    sessions: HashMap<SessionId, LiveSession>,
    events: Vec<MemoryEvent>,
    open_workers: usize,
    next_worker: u64,
    episode_length: u64,
}

/// A session the simulated service still serves.
struct LiveSession {
    worker_address: String,
    steps: u64,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            assignments: VecDeque::new(),
            master_failures: VecDeque::new(),
            worker_replies: VecDeque::new(),
            unreachable: HashSet::new(),
            sessions: HashMap::new(),
            events: Vec::new(),
            open_workers: 0,
            next_worker: 0,
            episode_length: DEFAULT_EPISODE_LENGTH,
        }
    }
}

/// Channel provider backed by an in-process simulated service.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryProvider {
    /// Create a provider with no scripted behavior.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Shared>, RpcError> {
        self.shared
            .lock()
            .map_err(|e| RpcError::internal(e.to_string()))
    }

    fn with_shared<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> Option<R> {
        self.lock().ok().map(|mut shared| f(&mut shared))
    }

    /// Queue the next master assignment.
    pub fn assign(&self, session_id: impl Into<String>, worker_address: impl Into<String>) {
        let assignment = StartGameResponse {
            session_id: session_id.into(),
            worker_address: worker_address.into(),
        };
        self.with_shared(|s| s.assignments.push_back(assignment));
    }

    /// Fail the next `StartGame` with `err`.
    pub fn fail_start_game(&self, err: RpcError) {
        self.with_shared(|s| s.master_failures.push_back(err));
    }

    /// Queue a scripted worker result, served before the built-in simulation.
    pub fn push_outcome(&self, outcome: StepOutcome) {
        self.with_shared(|s| s.worker_replies.push_back(Ok(outcome)));
    }

    /// Fail the next worker request with `err`.
    pub fn push_failure(&self, err: RpcError) {
        self.with_shared(|s| s.worker_replies.push_back(Err(err)));
    }

    /// Connecting to `address` never becomes ready.
    pub fn set_unreachable(&self, address: impl Into<String>) {
        let address = address.into();
        self.with_shared(|s| s.unreachable.insert(address));
    }

    /// Steps after which the built-in simulation ends an episode.
    pub fn set_episode_length(&self, steps: u64) {
        self.with_shared(|s| s.episode_length = steps);
    }

    /// Everything that happened so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<MemoryEvent> {
        self.with_shared(|s| s.events.clone()).unwrap_or_default()
    }

    /// Worker channels opened and not yet closed.
    #[must_use]
    pub fn open_workers(&self) -> usize {
        self.with_shared(|s| s.open_workers).unwrap_or_default()
    }

    /// Number of recorded events matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&MemoryEvent) -> bool) -> usize {
        self.with_shared(|s| s.events.iter().filter(|e| predicate(e)).count())
            .unwrap_or_default()
    }

    /// Whether the simulated service still considers a session live.
    ///
    /// A session ends when an episode finishes or its worker channel closes.
    #[must_use]
    pub fn is_session_live(&self, session_id: &str) -> bool {
        self.with_shared(|s| s.sessions.contains_key(session_id))
            .unwrap_or_default()
    }

    /// Open a master channel without waiting.
    ///
    /// # Errors
    /// Returns error if the shared state is poisoned.
    pub fn open_master(&self, address: &str) -> Result<MemoryMaster, RpcError> {
        self.lock()?
            .events
            .push(MemoryEvent::MasterOpened(address.to_string()));
        Ok(MemoryMaster {
            address: address.to_string(),
            provider: self.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Open a worker channel without waiting.
    ///
    /// # Errors
    /// Returns error if the shared state is poisoned.
    pub fn open_worker(&self, address: &str) -> Result<MemoryWorker, RpcError> {
        let mut shared = self.lock()?;
        shared.open_workers += 1;
        shared
            .events
            .push(MemoryEvent::WorkerOpened(address.to_string()));
        Ok(MemoryWorker {
            address: address.to_string(),
            provider: self.clone(),
            closed: AtomicBool::new(false),
        })
    }

    fn is_unreachable(&self, address: &str) -> bool {
        self.with_shared(|s| s.unreachable.contains(address))
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChannelProvider for MemoryProvider {
    type Master = MemoryMaster;
    type Worker = MemoryWorker;

    async fn connect_master(&self, address: &str) -> Result<MemoryMaster, RpcError> {
        if self.is_unreachable(address) {
            std::future::pending::<()>().await;
        }
        self.open_master(address)
    }

    async fn connect_worker(&self, address: &str) -> Result<MemoryWorker, RpcError> {
        if self.is_unreachable(address) {
            std::future::pending::<()>().await;
        }
        self.open_worker(address)
    }
}

/// Master channel of a `MemoryProvider`.
pub struct MemoryMaster {
    address: String,
    provider: MemoryProvider,
    closed: AtomicBool,
}

impl MemoryMaster {
    fn assign_session(&self, request: StartGameRequest) -> Result<StartGameResponse, RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::ChannelClosed);
        }

        let mut shared = self.provider.lock()?;
        shared.events.push(MemoryEvent::StartGame(request));
        if let Some(err) = shared.master_failures.pop_front() {
            return Err(err);
        }

        let assignment = if let Some(assignment) = shared.assignments.pop_front() {
            assignment
        } else {
            shared.next_worker += 1;
            StartGameResponse {
                session_id: Uuid::new_v4().to_string(),
                worker_address: format!("memory://worker-{}", shared.next_worker),
            }
        };
        shared.sessions.insert(
            assignment.session_id.clone(),
            LiveSession {
                worker_address: assignment.worker_address.clone(),
                steps: 0,
            },
        );
        Ok(assignment)
    }
}

#[async_trait]
impl MasterService for MemoryMaster {
    async fn start_game(&self, request: StartGameRequest) -> Result<StartGameResponse, RpcError> {
        self.assign_session(request)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let address = self.address.clone();
            self.provider
                .with_shared(|s| s.events.push(MemoryEvent::MasterClosed(address)));
        }
    }
}

/// Worker channel of a `MemoryProvider`.
pub struct MemoryWorker {
    address: String,
    provider: MemoryProvider,
    closed: AtomicBool,
}

impl MemoryWorker {
    fn reply(
        &self,
        event: MemoryEvent,
        session_id: &str,
        action: Option<u32>,
    ) -> Result<EnvResultResponse, RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::ChannelClosed);
        }

        let mut shared = self.provider.lock()?;
        shared.events.push(event);

        let outcome = match shared.worker_replies.pop_front() {
            Some(scripted) => scripted?,
            None => simulate(&mut shared, session_id, action)?,
        };
        if outcome.done {
            shared.sessions.remove(session_id);
        }

        let env_result = outcome
            .encode()
            .map_err(|e| RpcError::internal(e.to_string()))?;
        Ok(EnvResultResponse::new(env_result))
    }
}

/// Built-in simulation: counts steps and ends after the episode length.
fn simulate(
    shared: &mut Shared,
    session_id: &str,
    action: Option<u32>,
) -> Result<StepOutcome, RpcError> {
    let episode_length = shared.episode_length;
    let steps = &mut shared
        .sessions
        .get_mut(session_id)
        .ok_or_else(|| RpcError::failed_precondition(format!("Unknown game: {session_id}")))?
        .steps;

    if let Some(action) = action {
        if action as usize >= DEFAULT_ACTION_SET.len() {
            return Err(RpcError::invalid_argument(format!(
                "Bad action number: {action}"
            )));
        }
        *steps += 1;
    }

    Ok(StepOutcome::new(
        json!({ "steps": *steps }),
        0.0,
        *steps >= episode_length,
        Info::new(),
    ))
}

#[async_trait]
impl WorkerService for MemoryWorker {
    async fn get_env_result(
        &self,
        request: &InitialStateRequest,
    ) -> Result<EnvResultResponse, RpcError> {
        self.reply(
            MemoryEvent::GetEnvResult(request.clone()),
            &request.session_id,
            None,
        )
    }

    async fn step(&self, request: &StepRequest) -> Result<EnvResultResponse, RpcError> {
        self.reply(
            MemoryEvent::Step(request.clone()),
            &request.session_id,
            Some(request.action),
        )
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let address = self.address.clone();
            self.provider.with_shared(|s| {
                // Sessions served by a closed worker are forfeited.
                s.sessions.retain(|_, session| session.worker_address != address);
                s.open_workers = s.open_workers.saturating_sub(1);
                s.events.push(MemoryEvent::WorkerClosed(address));
            });
        }
    }
}
