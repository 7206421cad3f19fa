//! Interactive filter engine.
//!
//! [`filter_graph`] derives a view from a cached full graph. It is pure and
//! synchronous: no I/O, no strategy calls, safe on a UI thread.
//!
//! Steps:
//! 1. search query: keep nodes whose label contains it (case-insensitive)
//! 2. node types: keep nodes of an allowed type
//! 3. edges: keep those with both endpoints surviving
//! 4. relation types: keep edges of an allowed relation
//! 5. min weight: drop edges below the interactive threshold
//!
//! Unset or empty filter fields do not filter. The focus node is not exempt.

use std::collections::HashSet;

use super::models::{GraphFilters, GraphViewState};

/// Apply `filters` to `graph`, returning the view.
///
/// Idempotent, and never introduces nodes or edges absent from `graph`.
/// The returned view records the filters that produced it.
pub fn filter_graph(graph: &GraphViewState, filters: &GraphFilters) -> GraphViewState {
    let query = filters
        .search_query
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let node_types = filters.node_types.as_ref().filter(|s| !s.is_empty());
    let relation_types = filters.relation_types.as_ref().filter(|s| !s.is_empty());
    let min_weight = filters.min_weight.filter(|w| *w > 0.0);

    let nodes: Vec<_> = graph
        .nodes
        .iter()
        .filter(|n| {
            query
                .as_deref()
                .map(|q| n.label.to_lowercase().contains(q))
                .unwrap_or(true)
        })
        .filter(|n| {
            node_types
                .map(|types| types.contains(&n.node_type))
                .unwrap_or(true)
        })
        .cloned()
        .collect();

    let surviving: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

    let edges = graph
        .edges
        .iter()
        .filter(|e| surviving.contains(e.source.as_str()) && surviving.contains(e.target.as_str()))
        .filter(|e| {
            relation_types
                .map(|relations| relations.contains(&e.relation))
                .unwrap_or(true)
        })
        .filter(|e| min_weight.map(|w| e.weight >= w).unwrap_or(true))
        .cloned()
        .collect();

    GraphViewState {
        nodes,
        edges,
        focus_node_id: graph.focus_node_id.clone(),
        depth: graph.depth,
        strategies: graph.strategies.clone(),
        layout: graph.layout.clone(),
        filters: filters.clone(),
        warnings: graph.warnings.clone(),
        generated_at: graph.generated_at,
    }
}
