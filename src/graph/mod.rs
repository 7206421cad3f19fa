//! Knowledge graph generation and filtering.
//!
//! Builds a weighted graph of related resources around a focus resource
//! using pluggable relevance strategies, then serves filtered views of it
//! without re-running discovery.
//!
//! ## Architecture
//!
//! ```text
//! GenerateRequest ──► TraversalEngine (BFS per level)
//!                          │
//!               strategies (concurrent, fail closed)
//!                          │
//!                     aggregate (one proposal per node pair)
//!                          │
//!                 admit under node cap ──► GraphViewState (full graph)
//!                                                 │
//!                                  filter_graph (pure, synchronous)
//!                                                 │
//!                                          GraphViewState (view)
//! ```
//!
//! ## Modules
//!
//! - [`models`]: Data structures (GraphNode, GraphEdge, GraphViewState, GenerateRequest, GraphFilters)
//! - [`errors`]: Fatal error taxonomy
//! - [`aggregate`]: Multi-strategy weight aggregation
//! - [`engine`]: `GraphGenerator` trait and the `TraversalEngine` implementation
//! - [`filters`]: Interactive filter engine
//! - [`mock`]: `MockGraphGenerator` for testing (cfg(test) only)

pub mod aggregate;
pub mod engine;
pub mod errors;
pub mod filters;
pub mod models;

#[cfg(test)]
pub mod mock;

// Re-export primary types for convenience
pub use aggregate::{aggregate, combine_scores, AggregatedEdge};
pub use engine::{GraphGenerator, TraversalEngine};
pub use errors::GraphError;
pub use filters::filter_graph;
pub use models::{
    clamp_weight, edge_id, pair_key, GenerateRequest, GraphEdge, GraphFilters, GraphNode,
    GraphViewState, GraphWarning, KnowledgeGraph, NodePosition, NodeType, StrategyKind,
};
