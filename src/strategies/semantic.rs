//! Semantic similarity strategy.
//!
//! Proposes the nearest neighbours of each frontier resource in embedding
//! space. Resources without an embedding contribute nothing.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CandidateEdge, RelevanceStrategy, StrategyContext};
use crate::graph::StrategyKind;
use crate::store::ResourceStore;

pub const SEMANTIC_RELATION: &str = "semantic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    /// Neighbours requested per frontier resource
    pub top_k: usize,
    /// Similarities below this are not proposed
    pub similarity_floor: f64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            similarity_floor: 0.3,
        }
    }
}

pub struct SemanticStrategy {
    resources: Arc<dyn ResourceStore>,
    config: SemanticConfig,
}

impl SemanticStrategy {
    pub fn new(resources: Arc<dyn ResourceStore>, config: SemanticConfig) -> Self {
        Self { resources, config }
    }
}

#[async_trait]
impl RelevanceStrategy for SemanticStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Semantic
    }

    async fn execute(&self, ctx: &StrategyContext) -> Result<Vec<CandidateEdge>> {
        if self.config.top_k == 0 {
            return Ok(vec![]);
        }

        let mut candidates = Vec::new();
        for anchor in ctx.frontier_resource_ids() {
            let neighbors = self
                .resources
                .nearest_neighbors(&ctx.project_id, &anchor, self.config.top_k)
                .await?;
            let before = candidates.len();
            candidates.extend(
                neighbors
                    .into_iter()
                    .filter(|n| n.resource.id != anchor)
                    .map(|n| (n.similarity.clamp(0.0, 1.0), n))
                    .filter(|(score, _)| *score >= self.config.similarity_floor)
                    .map(|(score, n)| {
                        CandidateEdge::outgoing(
                            StrategyKind::Semantic,
                            anchor.clone(),
                            n.resource.to_node(),
                            SEMANTIC_RELATION,
                            score,
                        )
                    }),
            );
            debug!(
                "Semantic neighbours of {}: {} above floor",
                anchor,
                candidates.len() - before
            );
        }
        Ok(candidates)
    }
}
