//! Per-panel exploration session.
//!
//! Owns the generation state machine, the cached full graph and the current
//! filtered view. Generation is single-flight: a request made while another
//! is running is rejected. Each run is tagged with an epoch; a result whose
//! epoch is no longer current (the session was closed meanwhile) is
//! discarded instead of applied.
//!
//! Filtering is served from the cache and never reaches the generator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::graph::{
    filter_graph, GenerateRequest, GraphError, GraphFilters, GraphGenerator, GraphViewState,
};

use super::events::{GenerationState, SessionBus, SessionEvent};

/// What became of a generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateOutcome {
    /// The graph was generated (or served from cache); holds the current view
    Ready(Arc<GraphViewState>),
    /// Another generation was in progress; nothing happened
    Rejected,
    /// The run completed after the session moved on; its result was dropped
    Discarded,
}

struct Inner {
    state: GenerationState,
    epoch: u64,
    closed: bool,
    full: Option<Arc<GraphViewState>>,
    view: Option<Arc<GraphViewState>>,
    filters: GraphFilters,
    last_request: Option<GenerateRequest>,
}

pub struct ExplorerSession {
    id: Uuid,
    generator: Arc<dyn GraphGenerator>,
    inner: Mutex<Inner>,
    bus: SessionBus,
}

impl ExplorerSession {
    pub fn new(generator: Arc<dyn GraphGenerator>) -> Self {
        Self::with_bus(generator, SessionBus::default())
    }

    pub fn with_bus(generator: Arc<dyn GraphGenerator>, bus: SessionBus) -> Self {
        Self {
            id: Uuid::new_v4(),
            generator,
            inner: Mutex::new(Inner {
                state: GenerationState::Idle,
                epoch: 0,
                closed: false,
                full: None,
                view: None,
                filters: GraphFilters::default(),
                last_request: None,
            }),
            bus,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    // The lock is never held across an await point.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, inner: &mut Inner, state: GenerationState) {
        debug!(session = %self.id, epoch = inner.epoch, ?state, "Session state change");
        inner.state = state.clone();
        self.bus.emit(SessionEvent::StateChanged {
            session_id: self.id,
            epoch: inner.epoch,
            state,
        });
    }

    /// Generate a fresh full graph for `request`.
    ///
    /// On success the cache is replaced and the current filters are
    /// re-applied. A fatal error leaves the previous cache in place and
    /// moves the session to `Error`.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateOutcome, GraphError> {
        let epoch = {
            let mut inner = self.lock();
            if inner.closed {
                return Ok(GenerateOutcome::Discarded);
            }
            if inner.state.is_generating() {
                debug!(session = %self.id, "Generation already in progress, request rejected");
                return Ok(GenerateOutcome::Rejected);
            }
            inner.epoch += 1;
            self.set_state(&mut inner, GenerationState::Generating);
            inner.epoch
        };

        let mut flight = InFlight {
            session: self,
            epoch,
            settled: false,
        };
        let result = self.generator.generate_graph(&request).await;
        flight.settled = true;

        let mut inner = self.lock();
        if inner.closed || inner.epoch != epoch {
            debug!(session = %self.id, epoch, current = inner.epoch, "Stale generation discarded");
            return Ok(GenerateOutcome::Discarded);
        }

        match result {
            Ok(full) => {
                let full = Arc::new(full);
                let view = Arc::new(filter_graph(&full, &inner.filters));
                self.bus.emit(SessionEvent::GraphReady {
                    session_id: self.id,
                    epoch,
                    nodes: full.nodes.len(),
                    edges: full.edges.len(),
                    partial: full.is_partial(),
                });
                inner.full = Some(full);
                inner.view = Some(view.clone());
                inner.last_request = Some(request);
                self.set_state(&mut inner, GenerationState::Ready);
                Ok(GenerateOutcome::Ready(view))
            }
            Err(e) => {
                warn!(session = %self.id, epoch, "Generation failed: {}", e);
                self.set_state(
                    &mut inner,
                    GenerationState::Error {
                        message: e.to_string(),
                        retryable: e.is_retryable(),
                    },
                );
                Err(e)
            }
        }
    }

    /// Change the traversal depth of the last request.
    ///
    /// Regenerates only when the depth actually changes; otherwise the
    /// current view is returned as is.
    pub async fn set_depth(&self, max_depth: usize) -> Result<GenerateOutcome, GraphError> {
        let request = {
            let inner = self.lock();
            let last = inner.last_request.as_ref().ok_or_else(|| {
                GraphError::Configuration("no graph has been generated yet".into())
            })?;
            if last.max_depth == max_depth {
                if let Some(view) = &inner.view {
                    return Ok(GenerateOutcome::Ready(view.clone()));
                }
            }
            last.clone().with_depth(max_depth)
        };
        self.generate(request).await
    }

    /// Re-run the last request, e.g. after a retryable error.
    pub async fn retry(&self) -> Result<GenerateOutcome, GraphError> {
        let request = self.lock().last_request.clone().ok_or_else(|| {
            GraphError::Configuration("no request to retry".into())
        })?;
        self.generate(request).await
    }

    /// Apply interactive filters to the cached graph.
    ///
    /// Synchronous and I/O-free. The filters are remembered and re-applied
    /// to later generations; returns the new view when a graph is cached.
    pub fn apply_filters(&self, filters: GraphFilters) -> Option<Arc<GraphViewState>> {
        let mut inner = self.lock();
        if inner.closed {
            return None;
        }
        inner.filters = filters;
        let full = inner.full.clone()?;
        let view = Arc::new(filter_graph(&full, &inner.filters));
        inner.view = Some(view.clone());
        self.bus.emit(SessionEvent::FiltersApplied {
            session_id: self.id,
            nodes: view.nodes.len(),
            edges: view.edges.len(),
        });
        Some(view)
    }

    /// The current (filtered) view.
    pub fn view(&self) -> Option<Arc<GraphViewState>> {
        self.lock().view.clone()
    }

    /// The cached, unfiltered graph.
    pub fn full_graph(&self) -> Option<Arc<GraphViewState>> {
        self.lock().full.clone()
    }

    pub fn state(&self) -> GenerationState {
        self.lock().state.clone()
    }

    pub fn filters(&self) -> GraphFilters {
        self.lock().filters.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// Tear the session down. An in-flight run will be discarded.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.epoch += 1;
        inner.full = None;
        inner.view = None;
        self.set_state(&mut inner, GenerationState::Idle);
        self.bus.emit(SessionEvent::Closed {
            session_id: self.id,
        });
        info!(session = %self.id, "Session closed");
    }
}

/// Returns the session to a settled state if a generation future is
/// dropped before the generator answers.
struct InFlight<'a> {
    session: &'a ExplorerSession,
    epoch: u64,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut inner = self.session.lock();
        if inner.epoch == self.epoch && inner.state.is_generating() {
            let state = if inner.full.is_some() {
                GenerationState::Ready
            } else {
                GenerationState::Idle
            };
            self.session.set_state(&mut inner, state);
        }
    }
}
