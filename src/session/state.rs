//! Resource and gate state

use crate::embed::LoadError;

/// Lifecycle of one session resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

/// The session's readiness gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Not started, or at least one resource still loading
    Pending,
    /// Both resources are ready
    Ready,
    /// A resource failed; terminal for the session
    Failed,
    /// The session was cancelled or torn down
    Cancelled,
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GateStatus::Pending => "pending",
            GateStatus::Ready => "ready",
            GateStatus::Failed => "failed",
            GateStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A resource handle plus its state machine
#[derive(Debug)]
pub(crate) struct Slot<T> {
    pub(crate) state: ResourceState,
    pub(crate) handle: Option<T>,
    pub(crate) error: Option<LoadError>,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: ResourceState::Uninitialized,
            handle: None,
            error: None,
        }
    }

    /// Record the outcome of a load. Only a `Loading` slot can settle.
    pub(crate) fn settle(&mut self, outcome: Result<T, LoadError>) {
        if self.state != ResourceState::Loading {
            return;
        }
        match outcome {
            Ok(handle) => {
                self.state = ResourceState::Ready;
                self.handle = Some(handle);
            }
            Err(e) => {
                self.state = ResourceState::Failed;
                self.error = Some(e);
            }
        }
    }
}

/// Gate derived from the two resource states
pub(crate) fn gate_for(engine: ResourceState, provider: ResourceState) -> GateStatus {
    match (engine, provider) {
        (ResourceState::Failed, _) | (_, ResourceState::Failed) => GateStatus::Failed,
        (ResourceState::Ready, ResourceState::Ready) => GateStatus::Ready,
        _ => GateStatus::Pending,
    }
}
