//! Shared test fixtures.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::graph::{GraphEdge, GraphFilters, GraphNode, GraphViewState, StrategyKind};
use crate::store::{
    Backlink, InMemoryLibrary, LinkStore, MentionHit, OutgoingLink, Resource, ResourceStore,
    SimilarResource, StoredLink,
};
use crate::strategies::StrategyContext;

pub fn link(source: &str, target: &str, relation: &str, weight: Option<f64>) -> StoredLink {
    StoredLink {
        source_id: source.to_string(),
        target_id: target.to_string(),
        relation_type: relation.to_string(),
        weight,
    }
}

/// Project "p" holding plain resources r, a, b, c, d, e (no links).
pub async fn seeded_library() -> InMemoryLibrary {
    let lib = InMemoryLibrary::new();
    for id in ["r", "a", "b", "c", "d", "e"] {
        lib.upsert_resource(Resource::new(id, "p", id.to_uppercase()))
            .await;
    }
    lib
}

/// Strategy context whose frontier is `ids`; the first id is the focus.
pub async fn context_for(lib: &InMemoryLibrary, project: &str, ids: &[&str]) -> StrategyContext {
    let wanted: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    let frontier: Vec<GraphNode> = lib
        .get_resources(project, &wanted)
        .await
        .unwrap()
        .iter()
        .map(Resource::to_node)
        .collect();
    StrategyContext {
        project_id: project.to_string(),
        focus_resource_id: wanted.first().cloned().unwrap_or_default(),
        visited: wanted.iter().cloned().collect(),
        frontier,
        depth: 0,
    }
}

/// A generated-looking state with a fixed timestamp.
pub fn view_of(focus: &str, nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> GraphViewState {
    GraphViewState {
        nodes,
        edges,
        focus_node_id: focus.to_string(),
        depth: 2,
        strategies: StrategyKind::ALL.to_vec(),
        layout: None,
        filters: GraphFilters::default(),
        warnings: vec![],
        generated_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    }
}

/// A store whose every call fails, as when the backend is unreachable.
pub struct FailingStore;

pub fn failing_store() -> FailingStore {
    FailingStore
}

#[async_trait]
impl LinkStore for FailingStore {
    async fn get_outgoing_links(&self, _resource_id: &str) -> Result<Vec<OutgoingLink>> {
        anyhow::bail!("connection refused")
    }

    async fn get_backlinks(&self, _resource_id: &str) -> Result<Vec<Backlink>> {
        anyhow::bail!("connection refused")
    }
}

#[async_trait]
impl ResourceStore for FailingStore {
    async fn project_exists(&self, _project_id: &str) -> Result<bool> {
        anyhow::bail!("connection refused")
    }

    async fn get_resource(&self, _project_id: &str, _id: &str) -> Result<Option<Resource>> {
        anyhow::bail!("connection refused")
    }

    async fn get_resources(&self, _project_id: &str, _ids: &[String]) -> Result<Vec<Resource>> {
        anyhow::bail!("connection refused")
    }

    async fn search_mentions(
        &self,
        _project_id: &str,
        _title: &str,
        _exclude_id: &str,
    ) -> Result<Vec<MentionHit>> {
        anyhow::bail!("connection refused")
    }

    async fn resolve_titles_in(
        &self,
        _project_id: &str,
        _text: &str,
        _exclude_id: &str,
    ) -> Result<Vec<MentionHit>> {
        anyhow::bail!("connection refused")
    }

    async fn resources_with_tag(
        &self,
        _project_id: &str,
        _tag: &str,
        _limit: usize,
    ) -> Result<Vec<Resource>> {
        anyhow::bail!("connection refused")
    }

    async fn nearest_neighbors(
        &self,
        _project_id: &str,
        _resource_id: &str,
        _k: usize,
    ) -> Result<Vec<SimilarResource>> {
        anyhow::bail!("connection refused")
    }
}
