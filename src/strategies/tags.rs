//! Shared-tags strategy.
//!
//! Relates resources that carry common tags. The score is the Jaccard
//! index of the two (case-insensitive) tag sets.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{frontier_resources, CandidateEdge, RelevanceStrategy, StrategyContext};
use crate::graph::StrategyKind;
use crate::store::{normalize_tag, Resource, ResourceStore};

pub const SHARED_TAGS_RELATION: &str = "shared-tags";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagsConfig {
    /// Resources fetched per tag; bounds the cost of very common tags
    pub max_resources_per_tag: usize,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            max_resources_per_tag: 25,
        }
    }
}

pub struct TagsStrategy {
    resources: Arc<dyn ResourceStore>,
    config: TagsConfig,
}

impl TagsStrategy {
    pub fn new(resources: Arc<dyn ResourceStore>, config: TagsConfig) -> Self {
        Self { resources, config }
    }
}

/// Lowercased, trimmed, non-empty tags.
pub fn normalized_tags(resource: &Resource) -> BTreeSet<String> {
    resource
        .tags
        .iter()
        .map(|t| normalize_tag(t))
        .filter(|t| !t.is_empty())
        .collect()
}

/// |A ∩ B| / |A ∪ B|; 0 for two empty sets.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    }
}

#[async_trait]
impl RelevanceStrategy for TagsStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Tags
    }

    async fn execute(&self, ctx: &StrategyContext) -> Result<Vec<CandidateEdge>> {
        let mut candidates = Vec::new();

        for (id, resource) in frontier_resources(self.resources.as_ref(), ctx).await? {
            let tags = normalized_tags(&resource);
            let mut related: BTreeMap<String, Resource> = BTreeMap::new();
            for tag in &tags {
                for other in self
                    .resources
                    .resources_with_tag(&ctx.project_id, tag, self.config.max_resources_per_tag)
                    .await?
                {
                    if other.id != id {
                        related.entry(other.id.clone()).or_insert(other);
                    }
                }
            }

            for (_, other) in related {
                let score = jaccard(&tags, &normalized_tags(&other));
                if score > 0.0 {
                    candidates.push(CandidateEdge::outgoing(
                        StrategyKind::Tags,
                        id.clone(),
                        other.to_node(),
                        SHARED_TAGS_RELATION,
                        score,
                    ));
                }
            }
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLibrary;
    use crate::test_helpers::context_for;

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard(&set(&["a", "b"]), &set(&["b", "c"])), 1.0 / 3.0);
        assert_eq!(jaccard(&set(&["a"]), &set(&["a"])), 1.0);
        assert_eq!(jaccard(&set(&[]), &set(&[])), 0.0);
    }

    #[tokio::test]
    async fn test_shared_tags_case_insensitive() {
        let lib = InMemoryLibrary::new();
        lib.upsert_resource(Resource::new("a", "p", "A").with_tags(["Biology", "plants"]))
            .await;
        lib.upsert_resource(Resource::new("b", "p", "B").with_tags(["biology"]))
            .await;
        lib.upsert_resource(Resource::new("c", "p", "C").with_tags(["history"]))
            .await;
        let lib = Arc::new(lib);

        let strategy = TagsStrategy::new(lib.clone(), TagsConfig::default());
        let ctx = context_for(lib.as_ref(), "p", &["a"]).await;
        let candidates = strategy.execute(&ctx).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].endpoints(), ("a", "b"));
        assert_eq!(candidates[0].relation, SHARED_TAGS_RELATION);
        assert!((candidates[0].raw_score - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unicode_case_and_padding_match() {
        let lib = InMemoryLibrary::new();
        lib.upsert_resource(Resource::new("r", "p", "R").with_tags(["écologie"]))
            .await;
        lib.upsert_resource(Resource::new("a", "p", "A").with_tags(["Écologie"]))
            .await;
        lib.upsert_resource(Resource::new("b", "p", "B").with_tags([" écologie "]))
            .await;
        let lib = Arc::new(lib);

        let strategy = TagsStrategy::new(lib.clone(), TagsConfig::default());
        let ctx = context_for(lib.as_ref(), "p", &["r"]).await;
        let candidates = strategy.execute(&ctx).await.unwrap();

        let mut targets: Vec<&str> = candidates.iter().map(|c| c.target.id.as_str()).collect();
        targets.sort();
        assert_eq!(targets, vec!["a", "b"]);
        assert!(candidates.iter().all(|c| c.raw_score == 1.0));
    }

    #[tokio::test]
    async fn test_per_tag_limit() {
        let lib = InMemoryLibrary::new();
        lib.upsert_resource(Resource::new("a", "p", "A").with_tags(["common"]))
            .await;
        for i in 0..10 {
            lib.upsert_resource(Resource::new(format!("r{i}"), "p", "R").with_tags(["common"]))
                .await;
        }
        let lib = Arc::new(lib);

        let config = TagsConfig {
            max_resources_per_tag: 4,
        };
        let strategy = TagsStrategy::new(lib.clone(), config);
        let ctx = context_for(lib.as_ref(), "p", &["a"]).await;
        let candidates = strategy.execute(&ctx).await.unwrap();
        // the limit applies before excluding the anchor itself
        assert!(candidates.len() <= 4);
        assert!(!candidates.is_empty());
    }
}
