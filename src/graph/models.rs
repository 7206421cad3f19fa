//! Knowledge graph data models.
//!
//! Defines the complete type system shared by the traversal controller and
//! the filter engine:
//!
//! ## Canonical graph types
//! - [`NodeType`] / [`GraphNode`]: nodes shown in the explorer
//! - [`GraphEdge`]: canonical, weighted relations between nodes
//! - [`GraphViewState`]: a generated (or filtered) graph plus its provenance
//!
//! ## Generation inputs
//! - [`StrategyKind`]: which relevance strategies exist
//! - [`GenerateRequest`]: parameters of a single generation run
//! - [`GraphFilters`]: interactive, re-query-free filter set
//!
//! ## Diagnostics
//! - [`GraphWarning`]: non-fatal conditions collected during generation
//!
//! ## Accumulation
//! - [`KnowledgeGraph`]: petgraph wrapper with ID ↔ NodeIndex mapping used
//!   while a traversal is in progress

use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

use super::errors::GraphError;

// ============================================================================
// Nodes and edges
// ============================================================================

/// Kind of entity a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Resource,
    Concept,
    Person,
    Location,
    StudioOutput,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Concept => "concept",
            Self::Person => "person",
            Self::Location => "location",
            Self::StudioOutput => "studio-output",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resource" => Ok(Self::Resource),
            "concept" => Ok(Self::Concept),
            "person" => Ok(Self::Person),
            "location" => Ok(Self::Location),
            "studio-output" | "studio_output" => Ok(Self::StudioOutput),
            other => Err(format!("unknown node type: {}", other)),
        }
    }
}

/// A node of the explorer graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Stable identifier (resource id, or a synthetic concept id)
    pub id: String,
    /// Display string
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Opaque key-value bag (e.g. `isStudioOutput`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl GraphNode {
    /// Build a bare node without resource association.
    pub fn new(id: impl Into<String>, label: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_type,
            resource_id: None,
            resource_type: None,
            metadata: None,
        }
    }
}

/// A canonical weighted relation between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Deterministic id derived from source, target and relation
    pub id: String,
    pub source: String,
    pub target: String,
    /// Free-form label ("cites", "mentions", "semantic", ...)
    pub relation: String,
    /// Relevance weight, always within [0, 1]
    pub weight: f64,
}

impl GraphEdge {
    /// Create an edge, deriving its id and clamping the weight into [0, 1].
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
        weight: f64,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        let relation = relation.into();
        Self {
            id: edge_id(&source, &target, &relation),
            source,
            target,
            relation,
            weight: clamp_weight(weight),
        }
    }
}

/// Deterministic edge id: UUIDv5 over `source`, `target` and `relation`.
pub fn edge_id(source: &str, target: &str, relation: &str) -> String {
    let name = format!("knowledge-explorer:edge:{}\u{1f}{}\u{1f}{}", source, target, relation);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}

/// Clamp a score into [0, 1]. NaN collapses to 0.
pub fn clamp_weight(weight: f64) -> f64 {
    if weight.is_nan() {
        0.0
    } else {
        weight.clamp(0.0, 1.0)
    }
}

/// Canonical key for the relation between two nodes, independent of direction.
pub fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

// ============================================================================
// Strategies and requests
// ============================================================================

/// The relevance discovery heuristics the explorer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Links,
    Mentions,
    Semantic,
    Tags,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Links,
        StrategyKind::Mentions,
        StrategyKind::Semantic,
        StrategyKind::Tags,
    ];

    /// Name used for deterministic tie-breaking and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Links => "links",
            Self::Mentions => "mentions",
            Self::Semantic => "semantic",
            Self::Tags => "tags",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "links" => Ok(Self::Links),
            "mentions" => Ok(Self::Mentions),
            "semantic" => Ok(Self::Semantic),
            "tags" => Ok(Self::Tags),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

/// Parameters of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub project_id: String,
    pub focus_resource_id: String,
    /// Number of BFS levels to expand (≥ 1)
    pub max_depth: usize,
    pub strategies: BTreeSet<StrategyKind>,
    /// Hard cap on the node count, focus included (> 0)
    pub max_nodes: usize,
    /// Generation-time prune threshold within [0, 1]
    pub min_weight: f64,
}

impl GenerateRequest {
    /// Request with all strategies enabled and default budgets.
    pub fn new(project_id: impl Into<String>, focus_resource_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            focus_resource_id: focus_resource_id.into(),
            max_depth: 2,
            strategies: StrategyKind::ALL.into_iter().collect(),
            max_nodes: 50,
            min_weight: 0.0,
        }
    }

    pub fn with_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_min_weight(mut self, min_weight: f64) -> Self {
        self.min_weight = min_weight;
        self
    }

    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = StrategyKind>) -> Self {
        self.strategies = strategies.into_iter().collect();
        self
    }

    /// Reject requests that cannot be served before any strategy runs.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.project_id.trim().is_empty() {
            return Err(GraphError::Configuration("project id is missing".into()));
        }
        if self.focus_resource_id.trim().is_empty() {
            return Err(GraphError::Configuration(
                "focus resource id is missing".into(),
            ));
        }
        if self.max_depth < 1 {
            return Err(GraphError::Configuration(
                "max depth must be at least 1".into(),
            ));
        }
        if self.max_nodes == 0 {
            return Err(GraphError::Configuration(
                "max nodes must be greater than 0".into(),
            ));
        }
        if !self.min_weight.is_finite() || !(0.0..=1.0).contains(&self.min_weight) {
            return Err(GraphError::Configuration(format!(
                "min weight must be within [0, 1], got {}",
                self.min_weight
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Interactive filter set applied on top of a cached full graph.
///
/// Every field is optional; an unset (or empty) field does not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphFilters {
    /// Case-insensitive substring matched against node labels
    pub search_query: Option<String>,
    pub node_types: Option<BTreeSet<NodeType>>,
    pub relation_types: Option<BTreeSet<String>>,
    /// Interactive weight threshold, independent of the generation prune
    pub min_weight: Option<f64>,
}

impl GraphFilters {
    /// True when no field would remove anything.
    pub fn is_empty(&self) -> bool {
        self.search_query
            .as_deref()
            .map(|q| q.trim().is_empty())
            .unwrap_or(true)
            && self.node_types.as_ref().map(|s| s.is_empty()).unwrap_or(true)
            && self
                .relation_types
                .as_ref()
                .map(|s| s.is_empty())
                .unwrap_or(true)
            && self.min_weight.map(|w| w <= 0.0).unwrap_or(true)
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Non-fatal conditions returned alongside a generated graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphWarning {
    /// One executor failed at a level; its contribution was treated as empty.
    StrategyFailed {
        strategy: StrategyKind,
        depth: usize,
        message: String,
    },
    /// The node cap truncated a level; the graph is partial.
    BudgetExceeded {
        depth: usize,
        max_nodes: usize,
        dropped: usize,
    },
}

// ============================================================================
// View state
// ============================================================================

/// Screen position assigned by the consumer after generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

/// A generated graph (the cached "full" graph) or a filtered view of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphViewState {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub focus_node_id: String,
    /// The max depth used to build this graph
    pub depth: usize,
    /// Strategies that ran
    pub strategies: Vec<StrategyKind>,
    /// Assigned by the consumer, never by generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<HashMap<String, NodePosition>>,
    /// The last-applied filter set
    #[serde(default)]
    pub filters: GraphFilters,
    #[serde(default)]
    pub warnings: Vec<GraphWarning>,
    pub generated_at: DateTime<Utc>,
}

impl GraphViewState {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Edge between two nodes, in either direction.
    pub fn edge_between(&self, a: &str, b: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| {
            (e.source == a && e.target == b) || (e.source == b && e.target == a)
        })
    }

    /// True when the node cap truncated the graph.
    pub fn is_partial(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, GraphWarning::BudgetExceeded { .. }))
    }

    /// Check the structural invariants of a generated graph.
    pub fn validate(&self, max_nodes: usize) -> Result<(), GraphError> {
        let mut ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(GraphError::Generation(format!(
                    "duplicate node id after merge: {}",
                    node.id
                )));
            }
        }
        if !ids.contains(self.focus_node_id.as_str()) {
            return Err(GraphError::Generation(format!(
                "focus node {} missing from graph",
                self.focus_node_id
            )));
        }
        if self.nodes.len() > max_nodes {
            return Err(GraphError::Generation(format!(
                "graph holds {} nodes, cap is {}",
                self.nodes.len(),
                max_nodes
            )));
        }
        let mut pairs = HashSet::with_capacity(self.edges.len());
        for edge in &self.edges {
            if !ids.contains(edge.source.as_str()) || !ids.contains(edge.target.as_str()) {
                return Err(GraphError::Generation(format!(
                    "edge {} references a missing node",
                    edge.id
                )));
            }
            if !(0.0..=1.0).contains(&edge.weight) {
                return Err(GraphError::Generation(format!(
                    "edge {} has weight {} outside [0, 1]",
                    edge.id, edge.weight
                )));
            }
            if !pairs.insert(pair_key(&edge.source, &edge.target)) {
                return Err(GraphError::Generation(format!(
                    "more than one edge between {} and {}",
                    edge.source, edge.target
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// KnowledgeGraph: petgraph accumulator with ID mapping
// ============================================================================

/// Wrapper around `petgraph::DiGraph` used while a traversal accumulates
/// nodes and edges.
///
/// Keeps an `id_to_index` map for O(1) lookups, the BFS depth at which each
/// node was first introduced, and the set of node pairs that already carry a
/// canonical edge.
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    pub graph: DiGraph<GraphNode, GraphEdge>,
    pub id_to_index: HashMap<String, NodeIndex>,
    depths: HashMap<String, usize>,
    linked_pairs: HashSet<(String, String)>,
}

impl KnowledgeGraph {
    /// Start a graph holding only the focus node at depth 0.
    pub fn with_focus(focus: GraphNode) -> Self {
        let mut graph = Self {
            graph: DiGraph::new(),
            id_to_index: HashMap::new(),
            depths: HashMap::new(),
            linked_pairs: HashSet::new(),
        };
        graph.add_node(focus, 0);
        graph
    }

    /// Add a node first discovered at `depth`.
    /// If a node with the same ID already exists, returns its existing index.
    pub fn add_node(&mut self, node: GraphNode, depth: usize) -> NodeIndex {
        if let Some(&idx) = self.id_to_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.depths.insert(id.clone(), depth);
        self.id_to_index.insert(id, idx);
        idx
    }

    /// Add a canonical edge. Returns `None` when an endpoint is unknown or
    /// the pair already carries an edge.
    pub fn add_edge(&mut self, edge: GraphEdge) -> Option<EdgeIndex> {
        let from = *self.id_to_index.get(&edge.source)?;
        let to = *self.id_to_index.get(&edge.target)?;
        if !self.linked_pairs.insert(pair_key(&edge.source, &edge.target)) {
            return None;
        }
        Some(self.graph.add_edge(from, to, edge))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    pub fn is_linked(&self, a: &str, b: &str) -> bool {
        self.linked_pairs.contains(&pair_key(a, b))
    }

    /// Depth at which a node was first introduced.
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.depths.get(id).copied()
    }

    pub fn node_ids(&self) -> HashSet<String> {
        self.id_to_index.keys().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Export in insertion order (nodes by discovery, edges by admission).
    pub fn into_parts(self) -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let (nodes, edges) = self.graph.into_nodes_edges();
        (
            nodes.into_iter().map(|n| n.weight).collect(),
            edges.into_iter().map(|e| e.weight).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> GraphNode {
        GraphNode::new(id, id.to_uppercase(), NodeType::Resource)
    }

    #[test]
    fn test_edge_id_is_deterministic() {
        let a = GraphEdge::new("r", "a", "cites", 0.5);
        let b = GraphEdge::new("r", "a", "cites", 0.9);
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, GraphEdge::new("a", "r", "cites", 0.5).id);
        assert_ne!(a.id, GraphEdge::new("r", "a", "related", 0.5).id);
    }

    #[test]
    fn test_edge_weight_clamped() {
        assert_eq!(GraphEdge::new("a", "b", "x", 1.7).weight, 1.0);
        assert_eq!(GraphEdge::new("a", "b", "x", -0.2).weight, 0.0);
        assert_eq!(GraphEdge::new("a", "b", "x", f64::NAN).weight, 0.0);
    }

    #[test]
    fn test_node_type_serde_names() {
        let json = serde_json::to_string(&NodeType::StudioOutput).unwrap();
        assert_eq!(json, "\"studio-output\"");
        let parsed: NodeType = "Concept".parse().unwrap();
        assert_eq!(parsed, NodeType::Concept);
        assert!("galaxy".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_graph_node_wire_format() {
        let mut n = node("r1");
        n.resource_id = Some("r1".into());
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "resource");
        assert_eq!(value["resourceId"], "r1");
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn test_request_validation() {
        assert!(GenerateRequest::new("p", "r").validate().is_ok());
        assert!(matches!(
            GenerateRequest::new("", "r").validate(),
            Err(GraphError::Configuration(_))
        ));
        assert!(matches!(
            GenerateRequest::new("p", " ").validate(),
            Err(GraphError::Configuration(_))
        ));
        assert!(GenerateRequest::new("p", "r").with_depth(0).validate().is_err());
        assert!(GenerateRequest::new("p", "r").with_max_nodes(0).validate().is_err());
        assert!(GenerateRequest::new("p", "r")
            .with_min_weight(1.5)
            .validate()
            .is_err());
        assert!(GenerateRequest::new("p", "r")
            .with_min_weight(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_filters_is_empty() {
        assert!(GraphFilters::default().is_empty());
        let f = GraphFilters {
            search_query: Some("   ".into()),
            node_types: Some(BTreeSet::new()),
            min_weight: Some(0.0),
            ..Default::default()
        };
        assert!(f.is_empty());
        let f = GraphFilters {
            min_weight: Some(0.3),
            ..Default::default()
        };
        assert!(!f.is_empty());
    }

    #[test]
    fn test_knowledge_graph_rejects_duplicates() {
        let mut g = KnowledgeGraph::with_focus(node("r"));
        let first = g.add_node(node("a"), 1);
        let again = g.add_node(node("a"), 2);
        assert_eq!(first, again);
        assert_eq!(g.depth_of("a"), Some(1));
        assert_eq!(g.depth_of("r"), Some(0));

        assert!(g.add_edge(GraphEdge::new("r", "a", "cites", 1.0)).is_some());
        // Same pair, reverse direction, other relation: still one canonical edge
        assert!(g.add_edge(GraphEdge::new("a", "r", "semantic", 0.4)).is_none());
        // Dangling endpoint
        assert!(g.add_edge(GraphEdge::new("r", "ghost", "cites", 1.0)).is_none());
        assert_eq!(g.edge_count(), 1);
        assert!(g.is_linked("a", "r"));

        let (nodes, edges) = g.into_parts();
        assert_eq!(nodes.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), ["r", "a"]);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_validate_detects_violations() {
        let base = GraphViewState {
            nodes: vec![node("r"), node("a")],
            edges: vec![GraphEdge::new("r", "a", "cites", 1.0)],
            focus_node_id: "r".into(),
            depth: 1,
            strategies: vec![StrategyKind::Links],
            layout: None,
            filters: GraphFilters::default(),
            warnings: vec![],
            generated_at: Utc::now(),
        };
        assert!(base.validate(10).is_ok());
        assert!(base.validate(1).is_err());

        let mut dup = base.clone();
        dup.nodes.push(node("a"));
        assert!(dup.validate(10).is_err());

        let mut dangling = base.clone();
        dangling.edges.push(GraphEdge::new("r", "zzz", "cites", 1.0));
        assert!(dangling.validate(10).is_err());

        let mut twice = base.clone();
        twice.edges.push(GraphEdge::new("a", "r", "semantic", 0.3));
        assert!(twice.validate(10).is_err());

        let mut no_focus = base;
        no_focus.focus_node_id = "missing".into();
        assert!(no_focus.validate(10).is_err());
    }
}
