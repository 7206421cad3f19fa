//! Records exchanged with the resource and link stores.

use serde::{Deserialize, Serialize};

use crate::graph::{GraphNode, NodeType};

/// Resource types produced by the study tooling rather than imported.
const STUDIO_OUTPUT_TYPES: &[&str] = &[
    "studio-output",
    "flashcards",
    "quiz",
    "summary",
    "mind-map",
    "study-guide",
];

/// Canonical form tags are compared in: trimmed, Unicode-lowercased.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// A resource of a project's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Free-form type ("pdf", "note", "video", "concept", "quiz", ...)
    #[serde(default = "default_resource_type")]
    pub resource_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Content embedding (L2-normalized), when one has been computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

fn default_resource_type() -> String {
    "document".to_string()
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            title: title.into(),
            content: String::new(),
            resource_type: default_resource_type(),
            tags: Vec::new(),
            embedding: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Whether this resource was produced by the study tooling.
    pub fn is_studio_output(&self) -> bool {
        self.metadata
            .get("is_studio_output")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
            || STUDIO_OUTPUT_TYPES.contains(&self.resource_type.to_ascii_lowercase().as_str())
    }

    pub fn node_type(&self) -> NodeType {
        if self.is_studio_output() {
            return NodeType::StudioOutput;
        }
        match self.resource_type.to_ascii_lowercase().as_str() {
            "concept" => NodeType::Concept,
            "person" => NodeType::Person,
            "location" => NodeType::Location,
            _ => NodeType::Resource,
        }
    }

    /// Draft the graph node standing for this resource.
    pub fn to_node(&self) -> GraphNode {
        let metadata = self.is_studio_output().then(|| {
            let mut map = serde_json::Map::new();
            map.insert("isStudioOutput".into(), serde_json::Value::Bool(true));
            map
        });
        GraphNode {
            id: self.id.clone(),
            label: self.title.clone(),
            node_type: self.node_type(),
            resource_id: Some(self.id.clone()),
            resource_type: Some(self.resource_type.clone()),
            metadata,
        }
    }
}

/// A persisted directed relation, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLink {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Outgoing side of a stored link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingLink {
    pub target_id: String,
    pub relation_type: String,
    /// Unspecified weights are treated as 1.0
    pub weight: Option<f64>,
}

/// Incoming side of a stored link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backlink {
    pub source_id: String,
    pub relation_type: String,
    /// Weight stored on the link; unspecified weights are treated as 1.0
    #[serde(default)]
    pub weight: Option<f64>,
}

/// How closely a text matched a resource title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionMatch {
    /// Whole-word, case-sensitive occurrence of the title
    Exact,
    /// Whole-word occurrence ignoring case
    CaseInsensitive,
    /// Every significant title word occurs somewhere in the text
    Fuzzy,
}

/// A textual reference between two resources.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionHit {
    pub resource: Resource,
    pub match_kind: MentionMatch,
}

/// A nearest neighbour in embedding space.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarResource {
    pub resource: Resource,
    /// Cosine similarity in [-1, 1]
    pub similarity: f64,
}

/// Serialized form of a whole library, used by the in-memory backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySnapshot {
    pub projects: Vec<String>,
    pub resources: Vec<Resource>,
    pub links: Vec<StoredLink>,
}
