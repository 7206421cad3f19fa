//! Scripted strategies for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::{CandidateEdge, EdgeDirection, RelevanceStrategy, StrategyContext};
use crate::graph::{GraphNode, NodeType, StrategyKind};

/// Returns a fixed set of candidates, keeping those whose anchor is on the
/// current frontier.
pub struct FixedStrategy {
    kind: StrategyKind,
    edges: Vec<CandidateEdge>,
}

impl FixedStrategy {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            edges: vec![],
        }
    }

    /// Add an outgoing candidate `source -> target`.
    pub fn with_edge(self, source: &str, target: &str, relation: &str, score: f64) -> Self {
        self.with_candidate(source, target, relation, score, EdgeDirection::Outgoing)
    }

    /// Add an incoming candidate `target -> source` anchored on `source`.
    pub fn with_incoming(self, source: &str, target: &str, relation: &str, score: f64) -> Self {
        self.with_candidate(source, target, relation, score, EdgeDirection::Incoming)
    }

    fn with_candidate(
        mut self,
        source: &str,
        target: &str,
        relation: &str,
        score: f64,
        direction: EdgeDirection,
    ) -> Self {
        let mut node = GraphNode::new(target, target.to_uppercase(), NodeType::Resource);
        node.resource_id = Some(target.to_string());
        self.edges.push(CandidateEdge {
            source_id: source.to_string(),
            target: node,
            relation: relation.to_string(),
            raw_score: score,
            strategy: self.kind,
            direction,
        });
        self
    }
}

#[async_trait]
impl RelevanceStrategy for FixedStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn execute(&self, ctx: &StrategyContext) -> Result<Vec<CandidateEdge>> {
        Ok(self
            .edges
            .iter()
            .filter(|e| ctx.frontier.iter().any(|n| n.id == e.source_id))
            .cloned()
            .collect())
    }
}

/// Always errors.
pub struct FailingStrategy {
    kind: StrategyKind,
}

impl FailingStrategy {
    pub fn new(kind: StrategyKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl RelevanceStrategy for FailingStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn execute(&self, _ctx: &StrategyContext) -> Result<Vec<CandidateEdge>> {
        anyhow::bail!("store unavailable")
    }
}

/// Always panics.
pub struct PanickingStrategy {
    kind: StrategyKind,
}

impl PanickingStrategy {
    pub fn new(kind: StrategyKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl RelevanceStrategy for PanickingStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn execute(&self, _ctx: &StrategyContext) -> Result<Vec<CandidateEdge>> {
        panic!("strategy blew up")
    }
}

/// Wraps a strategy and counts executions, overall and per depth.
pub struct CountingStrategy {
    inner: Arc<dyn RelevanceStrategy>,
    calls: AtomicUsize,
    per_depth: std::sync::Mutex<HashMap<usize, usize>>,
}

impl CountingStrategy {
    pub fn new(inner: Arc<dyn RelevanceStrategy>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            per_depth: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_at_depth(&self, depth: usize) -> usize {
        self.per_depth
            .lock()
            .unwrap()
            .get(&depth)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl RelevanceStrategy for CountingStrategy {
    fn kind(&self) -> StrategyKind {
        self.inner.kind()
    }

    async fn execute(&self, ctx: &StrategyContext) -> Result<Vec<CandidateEdge>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.per_depth.lock().unwrap().entry(ctx.depth).or_insert(0) += 1;
        self.inner.execute(ctx).await
    }
}

/// Blocks until released, for single-flight tests.
pub struct GatedStrategy {
    kind: StrategyKind,
    gate: Arc<tokio::sync::Notify>,
    inner: FixedStrategy,
}

impl GatedStrategy {
    pub fn new(inner: FixedStrategy, gate: Arc<tokio::sync::Notify>) -> Self {
        Self {
            kind: inner.kind,
            gate,
            inner,
        }
    }
}

#[async_trait]
impl RelevanceStrategy for GatedStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn execute(&self, ctx: &StrategyContext) -> Result<Vec<CandidateEdge>> {
        self.gate.notified().await;
        self.inner.execute(ctx).await
    }
}
