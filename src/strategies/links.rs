//! Explicit links strategy.
//!
//! Follows persisted relations in both directions. A link scores its stored
//! weight (1.0 when unset) whichever endpoint it is reached from.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{CandidateEdge, RelevanceStrategy, StrategyContext};
use crate::graph::StrategyKind;
use crate::store::{LinkStore, Resource, ResourceStore};

/// Weight of a link stored without one.
const DEFAULT_LINK_WEIGHT: f64 = 1.0;

/// Stored weight, or the default when unset; `None` for non-finite weights.
fn link_weight(stored: Option<f64>) -> Option<f64> {
    Some(stored.unwrap_or(DEFAULT_LINK_WEIGHT)).filter(|w| w.is_finite())
}

pub struct LinksStrategy {
    links: Arc<dyn LinkStore>,
    resources: Arc<dyn ResourceStore>,
}

impl LinksStrategy {
    pub fn new(links: Arc<dyn LinkStore>, resources: Arc<dyn ResourceStore>) -> Self {
        Self { links, resources }
    }
}

#[async_trait]
impl RelevanceStrategy for LinksStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Links
    }

    async fn execute(&self, ctx: &StrategyContext) -> Result<Vec<CandidateEdge>> {
        let mut outgoing = Vec::new();
        let mut incoming = Vec::new();
        let mut wanted = Vec::new();

        for anchor in ctx.frontier_resource_ids() {
            for link in self.links.get_outgoing_links(&anchor).await? {
                wanted.push(link.target_id.clone());
                outgoing.push((anchor.clone(), link));
            }
            for link in self.links.get_backlinks(&anchor).await? {
                wanted.push(link.source_id.clone());
                incoming.push((anchor.clone(), link));
            }
        }
        if wanted.is_empty() {
            return Ok(vec![]);
        }
        wanted.sort();
        wanted.dedup();

        // Links may point at deleted or foreign-project resources
        let resolved: HashMap<String, Resource> = self
            .resources
            .get_resources(&ctx.project_id, &wanted)
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        let mut candidates = Vec::with_capacity(outgoing.len() + incoming.len());
        for (anchor, link) in outgoing {
            let Some(target) = resolved.get(&link.target_id) else {
                debug!("Skipping link {} -> {}: target not found", anchor, link.target_id);
                continue;
            };
            let Some(weight) = link_weight(link.weight) else {
                debug!("Skipping link {} -> {}: invalid weight", anchor, link.target_id);
                continue;
            };
            candidates.push(CandidateEdge::outgoing(
                StrategyKind::Links,
                anchor,
                target.to_node(),
                link.relation_type,
                weight,
            ));
        }
        for (anchor, link) in incoming {
            let Some(source) = resolved.get(&link.source_id) else {
                debug!("Skipping backlink {} -> {}: source not found", link.source_id, anchor);
                continue;
            };
            let Some(weight) = link_weight(link.weight) else {
                debug!("Skipping backlink {} -> {}: invalid weight", link.source_id, anchor);
                continue;
            };
            candidates.push(CandidateEdge::incoming(
                StrategyKind::Links,
                anchor,
                source.to_node(),
                link.relation_type,
                weight,
            ));
        }
        Ok(candidates)
    }
}
