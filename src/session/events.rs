//! Session event bus.
//!
//! Broadcasts [`SessionEvent`]s to UI consumers (loading indicators, retry
//! affordances, partial-graph badges) via `tokio::sync::broadcast`.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Default broadcast channel capacity
const DEFAULT_CAPACITY: usize = 1024;

/// Lifecycle of a session's generation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GenerationState {
    Idle,
    Generating,
    Ready,
    /// The last run failed fatally; `retryable` drives the retry affordance
    Error { message: String, retryable: bool },
}

impl GenerationState {
    pub fn is_generating(&self) -> bool {
        matches!(self, GenerationState::Generating)
    }
}

/// Something a UI panel may want to react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged {
        session_id: Uuid,
        epoch: u64,
        state: GenerationState,
    },
    /// A new full graph replaced the cached one
    GraphReady {
        session_id: Uuid,
        epoch: u64,
        nodes: usize,
        edges: usize,
        partial: bool,
    },
    /// A new view was derived from the cached graph
    FiltersApplied {
        session_id: Uuid,
        nodes: usize,
        edges: usize,
    },
    Closed {
        session_id: Uuid,
    },
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "state_changed",
            SessionEvent::GraphReady { .. } => "graph_ready",
            SessionEvent::FiltersApplied { .. } => "filters_applied",
            SessionEvent::Closed { .. } => "closed",
        }
    }
}

/// Event bus that distributes SessionEvents via `tokio::sync::broadcast`
///
/// Fire-and-forget: emitting never blocks, never panics.
/// If no subscribers are connected, events are silently dropped.
#[derive(Debug, Clone)]
pub struct SessionBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn emit(&self, event: SessionEvent) {
        let name = event.name();
        if let Ok(n) = self.sender.send(event) {
            debug!(event = name, subscribers = n, "SessionEvent emitted");
        }
    }
}

impl Default for SessionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
