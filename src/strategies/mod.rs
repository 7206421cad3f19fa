//! Relevance strategies.
//!
//! Each strategy is an independent heuristic that proposes candidate edges
//! from the current traversal frontier to related resources:
//!
//! - [`links`]: persisted, user- or system-created relations
//! - [`mentions`]: textual references between resources (backlink detection)
//! - [`semantic`]: nearest neighbours over content embeddings
//! - [`tags`]: resources sharing tags
//!
//! Strategies read from the library stores only; they never see or mutate
//! the graph being assembled. [`execute_all`] runs the enabled strategies of
//! one level concurrently and fails closed: an erroring or panicking
//! strategy contributes nothing and is reported in its [`StrategyRun`].

pub mod links;
pub mod mentions;
pub mod semantic;
pub mod tags;

#[cfg(test)]
pub mod mock;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::task::AbortOnDropHandle;
use tracing::warn;

use crate::graph::{GraphNode, StrategyKind};
use crate::store::{LinkStore, Resource, ResourceStore};

pub use links::LinksStrategy;
pub use mentions::{MentionsConfig, MentionsStrategy};
pub use semantic::{SemanticConfig, SemanticStrategy};
pub use tags::{TagsConfig, TagsStrategy};

// ============================================================================
// Contract types
// ============================================================================

/// Which way a candidate edge points relative to its frontier node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    /// frontier node → discovered node
    Outgoing,
    /// discovered node → frontier node
    Incoming,
}

/// A relation proposed by one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEdge {
    /// Frontier node the candidate was discovered from
    pub source_id: String,
    /// Draft of the related node
    pub target: GraphNode,
    pub relation: String,
    /// Strategy-specific score, expected within [0, 1]
    pub raw_score: f64,
    pub strategy: StrategyKind,
    pub direction: EdgeDirection,
}

impl CandidateEdge {
    pub fn outgoing(
        strategy: StrategyKind,
        source_id: impl Into<String>,
        target: GraphNode,
        relation: impl Into<String>,
        raw_score: f64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target,
            relation: relation.into(),
            raw_score,
            strategy,
            direction: EdgeDirection::Outgoing,
        }
    }

    pub fn incoming(
        strategy: StrategyKind,
        source_id: impl Into<String>,
        target: GraphNode,
        relation: impl Into<String>,
        raw_score: f64,
    ) -> Self {
        Self {
            direction: EdgeDirection::Incoming,
            ..Self::outgoing(strategy, source_id, target, relation, raw_score)
        }
    }

    /// `(source, target)` of the edge this candidate would become.
    pub fn endpoints(&self) -> (&str, &str) {
        match self.direction {
            EdgeDirection::Outgoing => (&self.source_id, &self.target.id),
            EdgeDirection::Incoming => (&self.target.id, &self.source_id),
        }
    }

    /// Stable ordering key, independent of arrival order.
    pub fn sort_key(&self) -> (&str, &str, &'static str, &str, EdgeDirection, u64) {
        (
            &self.source_id,
            &self.target.id,
            self.strategy.as_str(),
            &self.relation,
            self.direction,
            self.raw_score.to_bits(),
        )
    }
}

/// Read-only inputs of one strategy execution.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub project_id: String,
    pub focus_resource_id: String,
    /// Nodes first introduced at the previous level (the focus at depth 0)
    pub frontier: Vec<GraphNode>,
    /// Every node id already in the graph
    pub visited: HashSet<String>,
    pub depth: usize,
}

impl StrategyContext {
    /// Resource ids of the frontier nodes that are backed by a resource.
    pub fn frontier_resource_ids(&self) -> Vec<String> {
        self.frontier
            .iter()
            .filter_map(|n| n.resource_id.clone())
            .collect()
    }
}

/// A relevance discovery heuristic.
///
/// Implementations may fail with an error; callers go through
/// [`execute_fail_closed`] so a failure never aborts generation.
#[async_trait]
pub trait RelevanceStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Propose candidate edges leaving (or entering) the frontier.
    async fn execute(&self, ctx: &StrategyContext) -> Result<Vec<CandidateEdge>>;
}

/// Outcome of one strategy at one level.
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub strategy: StrategyKind,
    pub candidates: Vec<CandidateEdge>,
    /// Set when the strategy failed; `candidates` is then empty
    pub error: Option<String>,
}

impl StrategyRun {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Run one strategy, turning errors into an empty, annotated result.
///
/// Candidates are stamped with the strategy's kind, and candidates with a
/// non-finite score are dropped.
pub async fn execute_fail_closed(
    strategy: &dyn RelevanceStrategy,
    ctx: &StrategyContext,
) -> StrategyRun {
    let kind = strategy.kind();
    match strategy.execute(ctx).await {
        Ok(candidates) => StrategyRun {
            strategy: kind,
            candidates: candidates
                .into_iter()
                .filter(|c| c.raw_score.is_finite())
                .map(|c| CandidateEdge { strategy: kind, ..c })
                .collect(),
            error: None,
        },
        Err(e) => {
            warn!(
                strategy = %kind,
                depth = ctx.depth,
                "Strategy failed, contributing nothing: {:#}",
                e
            );
            StrategyRun {
                strategy: kind,
                candidates: vec![],
                error: Some(format!("{:#}", e)),
            }
        }
    }
}

/// Run strategies concurrently against the same context.
///
/// Each strategy runs on its own task so a panic is isolated like an error.
/// Results come back in the order of `strategies`, whatever the completion
/// order. Dropping the returned future aborts the tasks still running.
pub async fn execute_all(
    strategies: &[Arc<dyn RelevanceStrategy>],
    ctx: Arc<StrategyContext>,
) -> Vec<StrategyRun> {
    let handles = strategies.iter().map(|strategy| {
        let strategy = strategy.clone();
        let ctx = ctx.clone();
        AbortOnDropHandle::new(tokio::spawn(async move {
            execute_fail_closed(strategy.as_ref(), &ctx).await
        }))
    });
    let results = join_all(handles).await;

    strategies
        .iter()
        .zip(results)
        .map(|(strategy, result)| match result {
            Ok(run) => run,
            Err(e) => {
                let kind = strategy.kind();
                warn!(strategy = %kind, depth = ctx.depth, "Strategy task aborted: {}", e);
                StrategyRun {
                    strategy: kind,
                    candidates: vec![],
                    error: Some(format!("strategy task aborted: {}", e)),
                }
            }
        })
        .collect()
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Fetch the resources behind the frontier, keyed by id.
pub(crate) async fn frontier_resources(
    resources: &dyn ResourceStore,
    ctx: &StrategyContext,
) -> Result<BTreeMap<String, Resource>> {
    let ids = ctx.frontier_resource_ids();
    if ids.is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(resources
        .get_resources(&ctx.project_id, &ids)
        .await?
        .into_iter()
        .map(|r| (r.id.clone(), r))
        .collect())
}

/// Tuning knobs for the built-in strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub mentions: MentionsConfig,
    pub semantic: SemanticConfig,
    pub tags: TagsConfig,
}

/// Build the four built-in strategies over the given stores.
pub fn default_strategies(
    links: Arc<dyn LinkStore>,
    resources: Arc<dyn ResourceStore>,
    settings: &StrategySettings,
) -> Vec<Arc<dyn RelevanceStrategy>> {
    vec![
        Arc::new(LinksStrategy::new(links, resources.clone())),
        Arc::new(MentionsStrategy::new(
            resources.clone(),
            settings.mentions.clone(),
        )),
        Arc::new(SemanticStrategy::new(
            resources.clone(),
            settings.semantic.clone(),
        )),
        Arc::new(TagsStrategy::new(resources, settings.tags.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::mock::{FailingStrategy, FixedStrategy, GatedStrategy, PanickingStrategy};
    use std::time::Duration;
    use tokio::sync::Notify;
    use super::*;
    use crate::graph::NodeType;

    fn ctx() -> StrategyContext {
        let mut focus = GraphNode::new("r", "R", NodeType::Resource);
        focus.resource_id = Some("r".into());
        StrategyContext {
            project_id: "p".into(),
            focus_resource_id: "r".into(),
            frontier: vec![focus, GraphNode::new("c1", "Concept", NodeType::Concept)],
            visited: ["r".to_string()].into_iter().collect(),
            depth: 0,
        }
    }

    #[test]
    fn test_frontier_resource_ids_skip_synthetic_nodes() {
        assert_eq!(ctx().frontier_resource_ids(), vec!["r".to_string()]);
    }

    #[test]
    fn test_candidate_endpoints() {
        let node = GraphNode::new("a", "A", NodeType::Resource);
        let out = CandidateEdge::outgoing(StrategyKind::Links, "r", node.clone(), "cites", 1.0);
        let inc = CandidateEdge::incoming(StrategyKind::Links, "r", node, "cites", 1.0);
        assert_eq!(out.endpoints(), ("r", "a"));
        assert_eq!(inc.endpoints(), ("a", "r"));
        assert_ne!(out.sort_key(), inc.sort_key());
    }

    #[tokio::test]
    async fn test_fail_closed_on_error() {
        let run = execute_fail_closed(&FailingStrategy::new(StrategyKind::Tags), &ctx()).await;
        assert!(run.failed());
        assert!(run.candidates.is_empty());
        assert!(run.error.unwrap().contains("store unavailable"));
    }

    #[tokio::test]
    async fn test_non_finite_scores_dropped_and_kind_stamped() {
        let strategy = FixedStrategy::new(StrategyKind::Semantic)
            .with_edge("r", "a", "semantic", f64::NAN)
            .with_edge("r", "b", "semantic", 0.4);
        let run = execute_fail_closed(&strategy, &ctx()).await;
        assert_eq!(run.candidates.len(), 1);
        assert_eq!(run.candidates[0].target.id, "b");
        assert_eq!(run.candidates[0].strategy, StrategyKind::Semantic);
    }

    #[tokio::test]
    async fn test_execute_all_isolates_panics_and_keeps_order() {
        let strategies: Vec<Arc<dyn RelevanceStrategy>> = vec![
            Arc::new(PanickingStrategy::new(StrategyKind::Links)),
            Arc::new(FixedStrategy::new(StrategyKind::Mentions).with_edge("r", "a", "mentions", 0.6)),
            Arc::new(FailingStrategy::new(StrategyKind::Semantic)),
        ];
        let runs = execute_all(&strategies, Arc::new(ctx())).await;
        assert_eq!(
            runs.iter().map(|r| r.strategy).collect::<Vec<_>>(),
            vec![StrategyKind::Links, StrategyKind::Mentions, StrategyKind::Semantic]
        );
        assert!(runs[0].failed());
        assert!(!runs[1].failed());
        assert_eq!(runs[1].candidates.len(), 1);
        assert!(runs[2].failed());
    }

    #[tokio::test]
    async fn test_dropping_execute_all_aborts_running_strategies() {
        let gated: Arc<dyn RelevanceStrategy> = Arc::new(GatedStrategy::new(
            FixedStrategy::new(StrategyKind::Links).with_edge("r", "a", "cites", 1.0),
            Arc::new(Notify::new()),
        ));
        let strategies = vec![gated.clone()];

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), execute_all(&strategies, Arc::new(ctx())))
                .await;
        assert!(timed_out.is_err());

        // the aborted task releases its handle on the strategy
        tokio::time::timeout(Duration::from_secs(1), async {
            while Arc::strong_count(&gated) > 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("strategy task still running after drop");
    }

    #[tokio::test]
    async fn test_gated_strategy_runs_once_released() {
        let gate = Arc::new(Notify::new());
        let strategies: Vec<Arc<dyn RelevanceStrategy>> = vec![Arc::new(GatedStrategy::new(
            FixedStrategy::new(StrategyKind::Links).with_edge("r", "a", "cites", 1.0),
            gate.clone(),
        ))];
        let runs = tokio::spawn(async move { execute_all(&strategies, Arc::new(ctx())).await });
        tokio::task::yield_now().await;
        gate.notify_one();

        let runs = runs.await.unwrap();
        assert_eq!(runs.len(), 1);
        assert!(!runs[0].failed());
        assert_eq!(runs[0].candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_builtin_strategies_fail_closed_on_outage() {
        let store = Arc::new(crate::test_helpers::failing_store());
        let strategies = default_strategies(store.clone(), store, &StrategySettings::default());
        let runs = execute_all(&strategies, Arc::new(ctx())).await;
        assert_eq!(runs.len(), 4);
        assert!(runs.iter().all(|r| r.failed() && r.candidates.is_empty()));
    }
}
