//! Mock graph generator for testing consumers.
//!
//! Returns a pre-configured graph (or error) without running any strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use super::engine::GraphGenerator;
use super::errors::GraphError;
use super::models::{GenerateRequest, GraphFilters, GraphNode, GraphViewState, NodeType};

/// Mock implementation of `GraphGenerator` for testing.
///
/// Without a configured result it returns a graph holding only the focus.
pub struct MockGraphGenerator {
    result: Option<GraphViewState>,
    error: Option<String>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl MockGraphGenerator {
    pub fn new() -> Self {
        Self {
            result: None,
            error: None,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_result(mut self, state: GraphViewState) -> Self {
        self.result = Some(state);
        self
    }

    /// Fail every call with a `GraphError::Generation`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Block each call until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn focus_only(request: &GenerateRequest) -> GraphViewState {
        let mut focus = GraphNode::new(
            &request.focus_resource_id,
            &request.focus_resource_id,
            NodeType::Resource,
        );
        focus.resource_id = Some(request.focus_resource_id.clone());
        GraphViewState {
            nodes: vec![focus],
            edges: vec![],
            focus_node_id: request.focus_resource_id.clone(),
            depth: request.max_depth,
            strategies: request.strategies.iter().copied().collect(),
            layout: None,
            filters: GraphFilters::default(),
            warnings: vec![],
            generated_at: Utc::now(),
        }
    }
}

impl Default for MockGraphGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphGenerator for MockGraphGenerator {
    async fn generate_graph(
        &self,
        request: &GenerateRequest,
    ) -> Result<GraphViewState, GraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        request.validate()?;
        if let Some(message) = &self.error {
            return Err(GraphError::Generation(message.clone()));
        }
        Ok(self
            .result
            .clone()
            .map(|mut state| {
                state.depth = request.max_depth;
                state
            })
            .unwrap_or_else(|| Self::focus_only(request)))
    }
}
