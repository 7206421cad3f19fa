//! Knowledge Explorer
//!
//! Generates weighted knowledge graphs around a focus resource:
//! - Pluggable relevance strategies (explicit links, mentions, semantic
//!   similarity, shared tags) run concurrently per traversal level
//! - Multi-strategy evidence merged by probabilistic union
//! - Node and depth budgets with partial-graph reporting
//! - Pure, synchronous filtering of a cached full graph
//! - Per-panel sessions with a single-flight generation state machine

pub mod embeddings;
pub mod graph;
pub mod session;
pub mod store;
pub mod strategies;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use graph::{GenerateRequest, StrategyKind};
use strategies::{MentionsConfig, SemanticConfig, StrategySettings, TagsConfig};

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub explorer: ExplorerYamlConfig,
    pub mentions: MentionsConfig,
    pub semantic: SemanticConfig,
    pub tags: TagsConfig,
    pub embeddings: EmbeddingsConfig,
}

/// Default generation budgets
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExplorerYamlConfig {
    pub max_depth: usize,
    pub max_nodes: usize,
    pub min_weight: f64,
    pub strategies: Vec<StrategyKind>,
}

impl Default for ExplorerYamlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_nodes: 50,
            min_weight: 0.0,
            strategies: StrategyKind::ALL.to_vec(),
        }
    }
}

/// Embedding provider configuration section
///
/// Any OpenAI-compatible `/v1/embeddings` endpoint works. Set `url` to
/// "disabled" (or leave it empty) to run without an HTTP provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/v1/embeddings".into(),
            model: "nomic-embed-text".into(),
            api_key: None,
            dimensions: 768,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub max_depth: usize,
    pub max_nodes: usize,
    pub min_weight: f64,
    pub strategies: Vec<StrategyKind>,
    pub strategy_settings: StrategySettings,
    pub embeddings: EmbeddingsConfig,
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // 1. Load YAML config (or defaults if file not found)
        let yaml = Self::load_yaml(yaml_path);

        // 2. Build Config with env var overrides
        Ok(Self {
            max_depth: env_parse("EXPLORER_MAX_DEPTH").unwrap_or(yaml.explorer.max_depth),
            max_nodes: env_parse("EXPLORER_MAX_NODES").unwrap_or(yaml.explorer.max_nodes),
            min_weight: env_parse("EXPLORER_MIN_WEIGHT").unwrap_or(yaml.explorer.min_weight),
            strategies: std::env::var("EXPLORER_STRATEGIES")
                .ok()
                .and_then(|s| parse_strategy_list(&s))
                .unwrap_or(yaml.explorer.strategies),
            strategy_settings: StrategySettings {
                mentions: yaml.mentions,
                semantic: yaml.semantic,
                tags: yaml.tags,
            },
            embeddings: EmbeddingsConfig {
                url: std::env::var("EMBEDDING_URL").unwrap_or(yaml.embeddings.url),
                model: std::env::var("EMBEDDING_MODEL").unwrap_or(yaml.embeddings.model),
                api_key: std::env::var("EMBEDDING_API_KEY")
                    .ok()
                    .or(yaml.embeddings.api_key),
                dimensions: env_parse("EMBEDDING_DIMENSIONS")
                    .unwrap_or(yaml.embeddings.dimensions),
            },
        })
    }

    /// A request for `focus_resource_id` using the configured defaults.
    pub fn request(
        &self,
        project_id: impl Into<String>,
        focus_resource_id: impl Into<String>,
    ) -> GenerateRequest {
        GenerateRequest::new(project_id, focus_resource_id)
            .with_depth(self.max_depth)
            .with_max_nodes(self.max_nodes)
            .with_min_weight(self.min_weight)
            .with_strategies(self.strategies.iter().copied())
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.trim().parse().ok())
}

/// Parse a comma-separated strategy list; `None` if any name is unknown.
fn parse_strategy_list(list: &str) -> Option<Vec<StrategyKind>> {
    let parsed: std::result::Result<Vec<StrategyKind>, _> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<StrategyKind>)
        .collect();
    match parsed {
        Ok(strategies) => Some(strategies),
        Err(e) => {
            tracing::warn!("Ignoring EXPLORER_STRATEGIES={:?}: {}", list, e);
            None
        }
    }
}
