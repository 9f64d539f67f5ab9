//! Readiness orchestration
//!
//! A [`Session`] owns the vector index and the embedding provider for one
//! session. Both are loaded concurrently, exactly once, and are only handed
//! out once both are ready. Cancelling (or dropping) the session freezes its
//! observable state: loads that finish afterwards are discarded.

pub mod engine;
pub mod state;

use crate::config::{IndexConfig, SemdexConfig};
use crate::embed::{self, EmbeddingProvider, LoadError, ProviderLoader};
use crate::vector::VectorIndex;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub use engine::{EngineLoader, InMemoryEngineLoader};
pub use state::{GateStatus, ResourceState};

use state::{gate_for, Slot};

/// Session errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Orchestrator not ready (gate is {0})")]
    OrchestratorNotReady(GateStatus),

    #[error("Session resource failed to load: {0}")]
    Load(LoadError),

    #[error("Session cancelled")]
    Cancelled,

    #[error("No tokio runtime to run the session loads on")]
    NoRuntime,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Handles to the session's resources, available once the gate is open
#[derive(Clone)]
pub struct SessionHandles {
    pub index: Arc<VectorIndex>,
    pub provider: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for SessionHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandles")
            .field("index", &self.index)
            .field("provider", &self.provider.name())
            .finish()
    }
}

struct Resources {
    engine: Slot<Arc<VectorIndex>>,
    provider: Slot<Arc<dyn EmbeddingProvider>>,
}

impl Resources {
    fn gate(&self) -> GateStatus {
        gate_for(self.engine.state, self.provider.state)
    }
}

struct Shared {
    id: Uuid,
    index_config: IndexConfig,
    engine_loader: Arc<dyn EngineLoader>,
    provider_loader: Arc<dyn ProviderLoader>,
    resources: Mutex<Resources>,
    gate: watch::Sender<GateStatus>,
    cancel: CancellationToken,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Resources> {
        // Slots are only replaced wholesale, a poisoned guard is still consistent
        self.resources.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn load_engine(self: Arc<Self>) {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("engine load abandoned, session cancelled");
                return;
            }
            outcome = self.engine_loader.instantiate(&self.index_config) => outcome,
        };

        // Checked under the same lock `cancel` takes
        let mut resources = self.lock();
        if self.cancel.is_cancelled() {
            warn!("discarding engine loaded after cancellation");
            return;
        }
        if let Err(e) = &outcome {
            warn!(error = %e, "engine failed to load");
        }
        resources.engine.settle(outcome);
        self.publish(&resources);
    }

    async fn load_provider(self: Arc<Self>) {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("provider load abandoned, session cancelled");
                return;
            }
            outcome = self.provider_loader.load() => outcome,
        };

        let mut resources = self.lock();
        if self.cancel.is_cancelled() {
            warn!("discarding embedding provider loaded after cancellation");
            return;
        }
        if let Err(e) = &outcome {
            warn!(error = %e, "embedding provider failed to load");
        }
        resources.provider.settle(outcome);
        self.publish(&resources);
    }

    fn publish(&self, resources: &Resources) {
        let gate = resources.gate();
        if gate == GateStatus::Ready {
            info!("session ready");
        }
        self.gate.send_replace(gate);
    }
}

/// Owner of one session's index and embedding provider
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Create a session; nothing loads until [`start`](Self::start)
    pub fn new(
        index_config: IndexConfig,
        engine_loader: Arc<dyn EngineLoader>,
        provider_loader: Arc<dyn ProviderLoader>,
    ) -> Self {
        let (gate, _) = watch::channel(GateStatus::Pending);
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                index_config,
                engine_loader,
                provider_loader,
                resources: Mutex::new(Resources {
                    engine: Slot::new(),
                    provider: Slot::new(),
                }),
                gate,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// In-memory index plus the configured embedding provider
    pub fn from_config(config: &SemdexConfig) -> Self {
        Self::new(
            config.index.clone(),
            Arc::new(InMemoryEngineLoader),
            embed::loader_from_config(&config.embed),
        )
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Launch both resource loads concurrently on the current tokio runtime.
    /// Calling it again, or after cancellation, does nothing. Outside a
    /// runtime it fails with [`SessionError::NoRuntime`] and the session
    /// stays unstarted.
    pub fn start(&self) -> SessionResult<()> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        {
            let mut resources = self.shared.lock();
            if self.shared.cancel.is_cancelled()
                || resources.engine.state != ResourceState::Uninitialized
            {
                return Ok(());
            }
            resources.engine.state = ResourceState::Loading;
            resources.provider.state = ResourceState::Loading;
        }

        let span = info_span!("session", id = %self.shared.id);
        span.in_scope(|| info!("session starting"));
        runtime.spawn(Arc::clone(&self.shared).load_engine().instrument(span.clone()));
        runtime.spawn(Arc::clone(&self.shared).load_provider().instrument(span));
        Ok(())
    }

    /// Cancel the session. Loads still in flight are abandoned, and any that
    /// complete later leave the gate and handles untouched.
    pub fn cancel(&self) {
        let _resources = self.shared.lock();
        if self.shared.cancel.is_cancelled() {
            return;
        }
        self.shared.cancel.cancel();
        self.shared.gate.send_replace(GateStatus::Cancelled);
        debug!(session = %self.shared.id, "session cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Whether both resources are ready. Fails once the session is cancelled.
    pub fn is_ready(&self) -> SessionResult<bool> {
        if self.is_cancelled() {
            return Err(SessionError::OrchestratorNotReady(GateStatus::Cancelled));
        }
        Ok(self.gate() == GateStatus::Ready)
    }

    /// Current gate status
    pub fn gate(&self) -> GateStatus {
        *self.shared.gate.borrow()
    }

    pub fn engine_state(&self) -> ResourceState {
        self.shared.lock().engine.state
    }

    pub fn provider_state(&self) -> ResourceState {
        self.shared.lock().provider.state
    }

    /// The load error that closed the gate, if any
    pub fn failure(&self) -> Option<LoadError> {
        let resources = self.shared.lock();
        resources
            .engine
            .error
            .clone()
            .or_else(|| resources.provider.error.clone())
    }

    /// Resource handles, if the gate is open
    pub fn handles(&self) -> SessionResult<SessionHandles> {
        let resources = self.shared.lock();
        if self.is_cancelled() {
            return Err(SessionError::OrchestratorNotReady(GateStatus::Cancelled));
        }
        match (&resources.engine.handle, &resources.provider.handle) {
            (Some(index), Some(provider)) => Ok(SessionHandles {
                index: Arc::clone(index),
                provider: Arc::clone(provider),
            }),
            _ => Err(SessionError::OrchestratorNotReady(resources.gate())),
        }
    }

    /// Wait until the gate opens, fails, or the session is cancelled.
    /// Waits forever if the session is never started.
    pub async fn wait_ready(&self) -> SessionResult<SessionHandles> {
        let mut gate = self.shared.gate.subscribe();
        let status = match gate.wait_for(|status| *status != GateStatus::Pending).await {
            Ok(status) => *status,
            Err(_) => GateStatus::Cancelled,
        };

        match status {
            GateStatus::Ready => self.handles(),
            GateStatus::Failed => Err(SessionError::Load(
                self.failure()
                    .unwrap_or_else(|| LoadError::Engine("unknown load failure".to_string())),
            )),
            GateStatus::Cancelled => Err(SessionError::Cancelled),
            GateStatus::Pending => Err(SessionError::OrchestratorNotReady(GateStatus::Pending)),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.shared.id)
            .field("gate", &self.gate())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashingLoader;

    fn local_session() -> Session {
        Session::new(
            IndexConfig::default(),
            Arc::new(InMemoryEngineLoader),
            Arc::new(HashingLoader::new(16)),
        )
    }

    #[tokio::test]
    async fn test_not_ready_before_start() {
        let session = local_session();
        assert_eq!(session.is_ready(), Ok(false));
        assert_eq!(session.engine_state(), ResourceState::Uninitialized);
        assert_eq!(
            session.handles().unwrap_err(),
            SessionError::OrchestratorNotReady(GateStatus::Pending)
        );
    }

    #[tokio::test]
    async fn test_start_and_wait() {
        let session = local_session();
        session.start().unwrap();
        let handles = session.wait_ready().await.unwrap();
        assert_eq!(handles.provider.dimensions(), 16);
        assert_eq!(session.is_ready(), Ok(true));
        assert_eq!(session.engine_state(), ResourceState::Ready);
        assert_eq!(session.provider_state(), ResourceState::Ready);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let session = local_session();
        session.start().unwrap();
        let first = session.wait_ready().await.unwrap();
        session.start().unwrap();
        let second = session.handles().unwrap();
        assert!(Arc::ptr_eq(&first.index, &second.index));
    }

    #[test]
    fn test_start_outside_runtime() {
        let session = local_session();
        assert_eq!(session.start(), Err(SessionError::NoRuntime));
        assert_eq!(session.engine_state(), ResourceState::Uninitialized);
        assert_eq!(session.provider_state(), ResourceState::Uninitialized);

        // The same session can still be started once a runtime is available
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            session.start().unwrap();
            session.wait_ready().await.unwrap();
        });
        assert_eq!(session.is_ready(), Ok(true));
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let session = local_session();
        session.cancel();
        session.start().unwrap();
        assert_eq!(session.engine_state(), ResourceState::Uninitialized);
        assert_eq!(session.wait_ready().await.unwrap_err(), SessionError::Cancelled);
        assert!(session.is_ready().is_err());
    }
}
