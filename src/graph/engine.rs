//! Graph generation engine.
//!
//! The `GraphGenerator` trait is the single entry point for building a
//! knowledge graph around a focus resource. The real implementation,
//! [`TraversalEngine`], runs a breadth-first expansion:
//!
//! 1. **Resolve**: validate the request, check the project and focus resource
//! 2. **Expand**: per level, run the enabled strategies concurrently on the
//!    frontier, aggregate their candidates, prune below `min_weight`
//! 3. **Admit**: add nodes in weight order until the node cap, then the edges
//!    whose endpoints both made it
//! 4. **Validate**: check the structural invariants of the result
//!
//! The trait also enables mocking in session tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::store::{LinkStore, ResourceStore};
use crate::strategies::{
    default_strategies, execute_all, CandidateEdge, RelevanceStrategy, StrategyContext,
    StrategySettings,
};

use super::aggregate::{aggregate, AggregatedEdge};
use super::errors::GraphError;
use super::models::{
    GenerateRequest, GraphEdge, GraphFilters, GraphNode, GraphViewState, GraphWarning,
    KnowledgeGraph, StrategyKind,
};

// ============================================================================
// Trait
// ============================================================================

/// Builds the full (unfiltered) graph for a request.
///
/// Consumers use `Arc<dyn GraphGenerator>` for dependency injection.
#[async_trait]
pub trait GraphGenerator: Send + Sync {
    /// Generate a graph around `request.focus_resource_id`.
    ///
    /// Fatal conditions are returned as errors and leave nothing applied;
    /// non-fatal ones are collected in `GraphViewState::warnings`.
    async fn generate_graph(&self, request: &GenerateRequest)
        -> Result<GraphViewState, GraphError>;
}

// ============================================================================
// Concrete implementation
// ============================================================================

/// Breadth-first traversal engine over a set of relevance strategies.
pub struct TraversalEngine {
    resources: Arc<dyn ResourceStore>,
    strategies: BTreeMap<StrategyKind, Arc<dyn RelevanceStrategy>>,
}

impl TraversalEngine {
    /// Create an engine with the given strategies. A later strategy of the
    /// same kind replaces an earlier one.
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        strategies: impl IntoIterator<Item = Arc<dyn RelevanceStrategy>>,
    ) -> Self {
        Self {
            resources,
            strategies: strategies.into_iter().map(|s| (s.kind(), s)).collect(),
        }
    }

    /// Create an engine with the four built-in strategies.
    pub fn with_default_strategies(
        links: Arc<dyn LinkStore>,
        resources: Arc<dyn ResourceStore>,
        settings: &StrategySettings,
    ) -> Self {
        let strategies = default_strategies(links, resources.clone(), settings);
        Self::new(resources, strategies)
    }

    /// Strategy kinds this engine can run.
    pub fn registered(&self) -> Vec<StrategyKind> {
        self.strategies.keys().copied().collect()
    }

    fn enabled(
        &self,
        request: &GenerateRequest,
    ) -> Result<Vec<Arc<dyn RelevanceStrategy>>, GraphError> {
        request
            .strategies
            .iter()
            .map(|kind| {
                self.strategies.get(kind).cloned().ok_or_else(|| {
                    GraphError::Configuration(format!("strategy {} is not available", kind))
                })
            })
            .collect()
    }

    /// Resolve the focus resource into the depth-0 node.
    async fn resolve_focus(&self, request: &GenerateRequest) -> Result<GraphNode, GraphError> {
        let exists = self
            .resources
            .project_exists(&request.project_id)
            .await
            .map_err(|e| GraphError::Generation(format!("resource store unavailable: {:#}", e)))?;
        if !exists {
            return Err(GraphError::Configuration(format!(
                "project {} not found",
                request.project_id
            )));
        }

        let focus = self
            .resources
            .get_resource(&request.project_id, &request.focus_resource_id)
            .await
            .map_err(|e| GraphError::Generation(format!("resource store unavailable: {:#}", e)))?
            .ok_or_else(|| {
                GraphError::Configuration(format!(
                    "focus resource {} not found in project {}",
                    request.focus_resource_id, request.project_id
                ))
            })?;
        Ok(focus.to_node())
    }
}

#[async_trait]
impl GraphGenerator for TraversalEngine {
    async fn generate_graph(
        &self,
        request: &GenerateRequest,
    ) -> Result<GraphViewState, GraphError> {
        let started = std::time::Instant::now();
        request.validate()?;
        let enabled = self.enabled(request)?;
        let focus = self.resolve_focus(request).await?;
        let focus_id = focus.id.clone();

        let mut graph = KnowledgeGraph::with_focus(focus.clone());
        let mut warnings = Vec::new();
        let mut frontier = vec![focus];

        for depth in 0..request.max_depth {
            if frontier.is_empty() {
                debug!(depth, "Traversal quiescent");
                break;
            }
            if graph.node_count() >= request.max_nodes {
                debug!(depth, max_nodes = request.max_nodes, "Node cap reached");
                break;
            }
            if enabled.is_empty() {
                break;
            }

            let ctx = Arc::new(StrategyContext {
                project_id: request.project_id.clone(),
                focus_resource_id: request.focus_resource_id.clone(),
                frontier: std::mem::take(&mut frontier),
                visited: graph.node_ids(),
                depth,
            });
            let runs = execute_all(&enabled, ctx.clone()).await;

            let mut failures = Vec::new();
            let mut candidates: Vec<CandidateEdge> = Vec::new();
            for run in runs {
                match run.error {
                    Some(message) => {
                        failures.push(format!("{}: {}", run.strategy, message));
                        warnings.push(GraphWarning::StrategyFailed {
                            strategy: run.strategy,
                            depth,
                            message,
                        });
                    }
                    None => candidates.extend(run.candidates),
                }
            }
            if failures.len() == enabled.len() {
                return Err(GraphError::Generation(format!(
                    "all strategies failed at depth {}: {}",
                    depth,
                    failures.join("; ")
                )));
            }

            let proposed = candidates.len();
            candidates.retain(|c| {
                graph.contains(&c.source_id) && !graph.is_linked(&c.source_id, &c.target.id)
            });
            candidates.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

            let aggregated = aggregate(&candidates);
            let merged = aggregated.len();
            let proposals: Vec<AggregatedEdge> = aggregated
                .into_iter()
                .filter(|p| p.weight >= request.min_weight)
                .collect();

            let admitted = admit_level(&mut graph, &proposals, depth, request.max_nodes);
            if admitted.dropped > 0 {
                warnings.push(GraphWarning::BudgetExceeded {
                    depth,
                    max_nodes: request.max_nodes,
                    dropped: admitted.dropped,
                });
            }

            debug!(
                depth,
                frontier = ctx.frontier.len(),
                proposed,
                merged,
                kept = proposals.len(),
                new_nodes = admitted.nodes.len(),
                new_edges = admitted.edges,
                dropped = admitted.dropped,
                "Traversal level complete"
            );
            frontier = admitted.nodes;
        }

        let node_count = graph.node_count();
        let edge_count = graph.edge_count();
        let (nodes, edges) = graph.into_parts();
        let state = GraphViewState {
            nodes,
            edges,
            focus_node_id: focus_id,
            depth: request.max_depth,
            strategies: request.strategies.iter().copied().collect(),
            layout: None,
            filters: GraphFilters::default(),
            warnings,
            generated_at: Utc::now(),
        };
        state.validate(request.max_nodes)?;

        info!(
            project_id = %request.project_id,
            focus = %request.focus_resource_id,
            nodes = node_count,
            edges = edge_count,
            warnings = state.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Graph generated"
        );
        Ok(state)
    }
}

// ============================================================================
// Level admission
// ============================================================================

struct Admission {
    /// Nodes first introduced at this level, in admission order
    nodes: Vec<GraphNode>,
    edges: usize,
    /// New nodes refused by the cap
    dropped: usize,
}

/// Add one level's proposals to the graph.
///
/// New nodes are ranked by their strongest proposal (ties by id) and
/// admitted until the cap; then every proposal whose endpoints are both in
/// the graph becomes an edge.
fn admit_level(
    graph: &mut KnowledgeGraph,
    proposals: &[AggregatedEdge],
    depth: usize,
    max_nodes: usize,
) -> Admission {
    let mut best: HashMap<&str, (f64, &GraphNode)> = HashMap::new();
    for p in proposals {
        if graph.contains(&p.discovered.id) {
            continue;
        }
        best.entry(p.discovered.id.as_str())
            .and_modify(|(w, _)| *w = w.max(p.weight))
            .or_insert((p.weight, &p.discovered));
    }

    let mut ranked: Vec<(f64, &GraphNode)> = best.into_values().collect();
    ranked.sort_by(|(wa, a), (wb, b)| {
        wb.partial_cmp(wa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    let room = max_nodes.saturating_sub(graph.node_count());
    let dropped = ranked.len().saturating_sub(room);
    let nodes: Vec<GraphNode> = ranked
        .into_iter()
        .take(room)
        .map(|(_, node)| node.clone())
        .collect();
    for node in &nodes {
        graph.add_node(node.clone(), depth + 1);
    }

    let mut edges = 0;
    for p in proposals {
        let (source, target) = p.endpoints();
        if graph
            .add_edge(GraphEdge::new(source, target, p.relation.clone(), p.weight))
            .is_some()
        {
            edges += 1;
        }
    }

    Admission {
        nodes,
        edges,
        dropped,
    }
}

// ============================================================================
// Tests
// ============================================================================
