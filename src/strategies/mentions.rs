//! Mentions strategy (backlink detection).
//!
//! Finds resources whose content references a frontier resource's title,
//! and resources whose titles occur in the frontier resource's content.
//! The score depends on how closely the reference matches the title.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{frontier_resources, CandidateEdge, RelevanceStrategy, StrategyContext};
use crate::graph::StrategyKind;
use crate::store::{MentionMatch, ResourceStore};

pub const MENTIONS_RELATION: &str = "mentions";

/// Scores per match quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionsConfig {
    pub exact_score: f64,
    pub case_insensitive_score: f64,
    pub fuzzy_score: f64,
}

impl Default for MentionsConfig {
    fn default() -> Self {
        Self {
            exact_score: 0.9,
            case_insensitive_score: 0.75,
            fuzzy_score: 0.5,
        }
    }
}

impl MentionsConfig {
    pub fn score(&self, kind: MentionMatch) -> f64 {
        match kind {
            MentionMatch::Exact => self.exact_score,
            MentionMatch::CaseInsensitive => self.case_insensitive_score,
            MentionMatch::Fuzzy => self.fuzzy_score,
        }
    }
}

pub struct MentionsStrategy {
    resources: Arc<dyn ResourceStore>,
    config: MentionsConfig,
}

impl MentionsStrategy {
    pub fn new(resources: Arc<dyn ResourceStore>, config: MentionsConfig) -> Self {
        Self { resources, config }
    }
}

#[async_trait]
impl RelevanceStrategy for MentionsStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Mentions
    }

    async fn execute(&self, ctx: &StrategyContext) -> Result<Vec<CandidateEdge>> {
        let mut candidates = Vec::new();

        for (id, resource) in frontier_resources(self.resources.as_ref(), ctx).await? {
            // Who mentions this resource
            for hit in self
                .resources
                .search_mentions(&ctx.project_id, &resource.title, &id)
                .await?
            {
                candidates.push(CandidateEdge::incoming(
                    StrategyKind::Mentions,
                    id.clone(),
                    hit.resource.to_node(),
                    MENTIONS_RELATION,
                    self.config.score(hit.match_kind),
                ));
            }

            // What this resource mentions
            if resource.content.is_empty() {
                continue;
            }
            for hit in self
                .resources
                .resolve_titles_in(&ctx.project_id, &resource.content, &id)
                .await?
            {
                candidates.push(CandidateEdge::outgoing(
                    StrategyKind::Mentions,
                    id.clone(),
                    hit.resource.to_node(),
                    MENTIONS_RELATION,
                    self.config.score(hit.match_kind),
                ));
            }
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryLibrary, Resource};
    use crate::strategies::EdgeDirection;
    use crate::test_helpers::context_for;

    async fn library() -> Arc<InMemoryLibrary> {
        let lib = InMemoryLibrary::new();
        lib.upsert_resource(
            Resource::new("cell", "p", "Cell Biology")
                .with_content("Cells depend on Photosynthesis in plants."),
        )
        .await;
        lib.upsert_resource(
            Resource::new("photo", "p", "Photosynthesis").with_content("Light reactions."),
        )
        .await;
        lib.upsert_resource(
            Resource::new("notes", "p", "Lecture notes")
                .with_content("Today: an intro to cell biology."),
        )
        .await;
        lib.upsert_resource(
            Resource::new("loose", "p", "Reading list")
                .with_content("Biology of the cell, chapter 3."),
        )
        .await;
        Arc::new(lib)
    }

    #[tokio::test]
    async fn test_backlinks_scored_by_match_quality() {
        let lib = library().await;
        let strategy = MentionsStrategy::new(lib.clone(), MentionsConfig::default());
        let ctx = context_for(lib.as_ref(), "p", &["cell"]).await;

        let candidates = strategy.execute(&ctx).await.unwrap();

        let notes = candidates.iter().find(|c| c.target.id == "notes").unwrap();
        assert_eq!(notes.direction, EdgeDirection::Incoming);
        assert_eq!(notes.endpoints(), ("notes", "cell"));
        assert_eq!(notes.raw_score, 0.75);

        let loose = candidates.iter().find(|c| c.target.id == "loose").unwrap();
        assert_eq!(loose.raw_score, 0.5);
        assert!(candidates.iter().all(|c| c.relation == MENTIONS_RELATION));
    }

    #[tokio::test]
    async fn test_forward_mentions_are_outgoing() {
        let lib = library().await;
        let strategy = MentionsStrategy::new(lib.clone(), MentionsConfig::default());
        let ctx = context_for(lib.as_ref(), "p", &["cell"]).await;

        let candidates = strategy.execute(&ctx).await.unwrap();
        let photo = candidates.iter().find(|c| c.target.id == "photo").unwrap();
        assert_eq!(photo.direction, EdgeDirection::Outgoing);
        assert_eq!(photo.endpoints(), ("cell", "photo"));
        assert_eq!(photo.raw_score, 0.9);
    }

    #[tokio::test]
    async fn test_custom_scores() {
        let lib = library().await;
        let config = MentionsConfig {
            exact_score: 0.6,
            ..Default::default()
        };
        let strategy = MentionsStrategy::new(lib.clone(), config);
        let ctx = context_for(lib.as_ref(), "p", &["photo"]).await;

        let candidates = strategy.execute(&ctx).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].endpoints(), ("cell", "photo"));
        assert_eq!(candidates[0].raw_score, 0.6);
    }
}
