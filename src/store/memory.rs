//! In-memory library backend.
//!
//! Implements both [`LinkStore`] and [`ResourceStore`] over
//! `tokio::sync::RwLock<HashMap<K, V>>` collections. Used by the CLI (loaded
//! from a JSON [`LibrarySnapshot`]) and by tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::embeddings::EmbeddingProvider;

use super::models::{
    normalize_tag, Backlink, LibrarySnapshot, MentionHit, MentionMatch, OutgoingLink, Resource,
    SimilarResource, StoredLink,
};
use super::traits::{LinkStore, ResourceStore};

/// Title words shorter than this are ignored by fuzzy matching.
const MIN_FUZZY_WORD_LEN: usize = 3;

/// In-memory implementation of the library stores.
pub struct InMemoryLibrary {
    pub projects: RwLock<HashSet<String>>,
    pub resources: RwLock<HashMap<String, Resource>>,
    pub outgoing: RwLock<HashMap<String, Vec<StoredLink>>>,
    pub incoming: RwLock<HashMap<String, Vec<StoredLink>>>,
    /// Compiled title matchers, keyed by title
    title_matchers: RwLock<HashMap<String, Arc<TitleMatcher>>>,
}

impl InMemoryLibrary {
    /// Create a new empty library.
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashSet::new()),
            resources: RwLock::new(HashMap::new()),
            outgoing: RwLock::new(HashMap::new()),
            incoming: RwLock::new(HashMap::new()),
            title_matchers: RwLock::new(HashMap::new()),
        }
    }

    /// Build a library from a snapshot.
    ///
    /// Projects referenced by resources are registered even when the
    /// snapshot does not list them.
    pub async fn from_snapshot(snapshot: LibrarySnapshot) -> Self {
        let library = Self::new();
        for project in snapshot.projects {
            library.add_project(project).await;
        }
        for resource in snapshot.resources {
            library.upsert_resource(resource).await;
        }
        for link in snapshot.links {
            library.add_link(link).await;
        }
        library
    }

    /// Load a JSON snapshot from disk.
    pub async fn load_json(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read library {}", path.display()))?;
        let snapshot: LibrarySnapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse library {}", path.display()))?;
        info!(
            "Loaded library from {} ({} resources, {} links)",
            path.display(),
            snapshot.resources.len(),
            snapshot.links.len()
        );
        Ok(Self::from_snapshot(snapshot).await)
    }

    /// Write the current contents as a JSON snapshot.
    pub async fn save_json(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot().await;
        let contents = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write library {}", path.display()))?;
        Ok(())
    }

    /// Export a sorted snapshot.
    pub async fn snapshot(&self) -> LibrarySnapshot {
        let mut projects: Vec<String> = self.projects.read().await.iter().cloned().collect();
        projects.sort();
        let mut resources: Vec<Resource> = self.resources.read().await.values().cloned().collect();
        resources.sort_by(|a, b| a.id.cmp(&b.id));
        let mut links: Vec<StoredLink> = self
            .outgoing
            .read()
            .await
            .values()
            .flatten()
            .cloned()
            .collect();
        links.sort_by(|a, b| {
            (&a.source_id, &a.target_id, &a.relation_type).cmp(&(
                &b.source_id,
                &b.target_id,
                &b.relation_type,
            ))
        });
        LibrarySnapshot {
            projects,
            resources,
            links,
        }
    }

    pub async fn add_project(&self, project_id: impl Into<String>) {
        self.projects.write().await.insert(project_id.into());
    }

    /// Insert or replace a resource, registering its project.
    pub async fn upsert_resource(&self, resource: Resource) {
        self.projects.write().await.insert(resource.project_id.clone());
        self.resources
            .write()
            .await
            .insert(resource.id.clone(), resource);
    }

    pub async fn add_link(&self, link: StoredLink) {
        self.incoming
            .write()
            .await
            .entry(link.target_id.clone())
            .or_default()
            .push(link.clone());
        self.outgoing
            .write()
            .await
            .entry(link.source_id.clone())
            .or_default()
            .push(link);
    }

    /// Compute embeddings for resources that have none.
    ///
    /// Returns the number of resources updated.
    pub async fn fill_missing_embeddings(&self, provider: &dyn EmbeddingProvider) -> Result<usize> {
        let pending: Vec<(String, String)> = {
            let resources = self.resources.read().await;
            let mut pending: Vec<(String, String)> = resources
                .values()
                .filter(|r| r.embedding.is_none())
                .map(|r| (r.id.clone(), embedding_text(r)))
                .collect();
            pending.sort();
            pending
        };
        if pending.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = pending.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = provider.embed_batch(&texts).await?;
        anyhow::ensure!(
            embeddings.len() == pending.len(),
            "Embedding provider returned {} vectors for {} inputs",
            embeddings.len(),
            pending.len()
        );

        let mut resources = self.resources.write().await;
        let mut updated = 0;
        for ((id, _), embedding) in pending.into_iter().zip(embeddings) {
            if let Some(resource) = resources.get_mut(&id) {
                resource.embedding = Some(embedding);
                updated += 1;
            }
        }
        debug!(
            "Filled {} embeddings with model {}",
            updated,
            provider.model_name()
        );
        Ok(updated)
    }

    /// Matcher for `title`, compiled on first use. `None` for blank titles.
    async fn title_matcher(&self, title: &str) -> Result<Option<Arc<TitleMatcher>>> {
        if let Some(matcher) = self.title_matchers.read().await.get(title) {
            return Ok(Some(matcher.clone()));
        }
        let Some(matcher) = TitleMatcher::new(title)? else {
            return Ok(None);
        };
        let matcher = Arc::new(matcher);
        self.title_matchers
            .write()
            .await
            .insert(title.to_string(), matcher.clone());
        Ok(Some(matcher))
    }

    async fn project_resources(&self, project_id: &str) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .resources
            .read()
            .await
            .values()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect();
        resources.sort_by(|a, b| a.id.cmp(&b.id));
        resources
    }
}

impl Default for InMemoryLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Text fed to the embedding provider for a resource.
pub fn embedding_text(resource: &Resource) -> String {
    if resource.content.is_empty() {
        resource.title.clone()
    } else {
        format!("{}\n{}", resource.title, resource.content)
    }
}

/// Lowercased alphanumeric words of a text.
fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Literal pattern for `title`, anchored on word boundaries where the title
/// starts or ends with a word character.
fn whole_word_pattern(title: &str) -> String {
    let starts = title.chars().next().map(is_word_char).unwrap_or(false);
    let ends = title.chars().last().map(is_word_char).unwrap_or(false);
    format!(
        "{}{}{}",
        if starts { r"\b" } else { "" },
        regex::escape(title),
        if ends { r"\b" } else { "" }
    )
}

/// Compiled patterns for recognising one title in texts.
pub struct TitleMatcher {
    exact: Regex,
    case_insensitive: Regex,
    /// Title words long enough for fuzzy matching
    significant: Vec<String>,
}

impl TitleMatcher {
    /// Compile the patterns for `title`; `None` when the title is blank.
    pub fn new(title: &str) -> Result<Option<Self>> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }
        let pattern = whole_word_pattern(title);
        Ok(Some(Self {
            exact: Regex::new(&pattern)?,
            case_insensitive: Regex::new(&format!("(?i){}", pattern))?,
            significant: words(title)
                .into_iter()
                .filter(|w| w.chars().count() >= MIN_FUZZY_WORD_LEN)
                .collect(),
        }))
    }

    /// Classify how `text` references the title, if at all.
    pub fn classify(&self, text: &str) -> Option<MentionMatch> {
        if text.is_empty() {
            return None;
        }
        if self.exact.is_match(text) {
            return Some(MentionMatch::Exact);
        }
        if self.case_insensitive.is_match(text) {
            return Some(MentionMatch::CaseInsensitive);
        }
        if self.significant.is_empty() {
            return None;
        }
        let text_words = words(text);
        self.significant
            .iter()
            .all(|w| text_words.contains(w))
            .then_some(MentionMatch::Fuzzy)
    }
}

/// Classify how `text` references `title`, if at all.
pub fn match_title(title: &str, text: &str) -> Result<Option<MentionMatch>> {
    Ok(TitleMatcher::new(title)?.and_then(|m| m.classify(text)))
}

/// Cosine similarity of two vectors; 0 when either is empty or zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[async_trait]
impl LinkStore for InMemoryLibrary {
    async fn get_outgoing_links(&self, resource_id: &str) -> Result<Vec<OutgoingLink>> {
        Ok(self
            .outgoing
            .read()
            .await
            .get(resource_id)
            .map(|links| {
                links
                    .iter()
                    .map(|l| OutgoingLink {
                        target_id: l.target_id.clone(),
                        relation_type: l.relation_type.clone(),
                        weight: l.weight,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_backlinks(&self, resource_id: &str) -> Result<Vec<Backlink>> {
        Ok(self
            .incoming
            .read()
            .await
            .get(resource_id)
            .map(|links| {
                links
                    .iter()
                    .map(|l| Backlink {
                        source_id: l.source_id.clone(),
                        relation_type: l.relation_type.clone(),
                        weight: l.weight,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl ResourceStore for InMemoryLibrary {
    async fn project_exists(&self, project_id: &str) -> Result<bool> {
        Ok(self.projects.read().await.contains(project_id))
    }

    async fn get_resource(&self, project_id: &str, resource_id: &str) -> Result<Option<Resource>> {
        Ok(self
            .resources
            .read()
            .await
            .get(resource_id)
            .filter(|r| r.project_id == project_id)
            .cloned())
    }

    async fn get_resources(
        &self,
        project_id: &str,
        resource_ids: &[String],
    ) -> Result<Vec<Resource>> {
        let resources = self.resources.read().await;
        Ok(resource_ids
            .iter()
            .filter_map(|id| resources.get(id))
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn search_mentions(
        &self,
        project_id: &str,
        title: &str,
        exclude_id: &str,
    ) -> Result<Vec<MentionHit>> {
        let Some(matcher) = self.title_matcher(title).await? else {
            return Ok(vec![]);
        };
        let mut hits = Vec::new();
        for resource in self.project_resources(project_id).await {
            if resource.id == exclude_id {
                continue;
            }
            if let Some(match_kind) = matcher.classify(&resource.content) {
                hits.push(MentionHit {
                    resource,
                    match_kind,
                });
            }
        }
        Ok(hits)
    }

    async fn resolve_titles_in(
        &self,
        project_id: &str,
        text: &str,
        exclude_id: &str,
    ) -> Result<Vec<MentionHit>> {
        let mut hits = Vec::new();
        for resource in self.project_resources(project_id).await {
            if resource.id == exclude_id {
                continue;
            }
            let Some(matcher) = self.title_matcher(&resource.title).await? else {
                continue;
            };
            if let Some(match_kind) = matcher.classify(text) {
                hits.push(MentionHit {
                    resource,
                    match_kind,
                });
            }
        }
        Ok(hits)
    }

    async fn resources_with_tag(
        &self,
        project_id: &str,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<Resource>> {
        let tag = normalize_tag(tag);
        if tag.is_empty() {
            return Ok(vec![]);
        }
        let mut tagged: Vec<Resource> = self
            .project_resources(project_id)
            .await
            .into_iter()
            .filter(|r| r.tags.iter().any(|t| normalize_tag(t) == tag))
            .collect();
        tagged.truncate(limit);
        Ok(tagged)
    }

    async fn nearest_neighbors(
        &self,
        project_id: &str,
        resource_id: &str,
        k: usize,
    ) -> Result<Vec<SimilarResource>> {
        let Some(origin) = self.get_resource(project_id, resource_id).await? else {
            return Ok(vec![]);
        };
        let Some(query) = origin.embedding.as_deref() else {
            return Ok(vec![]);
        };

        let mut neighbors: Vec<SimilarResource> = self
            .project_resources(project_id)
            .await
            .into_iter()
            .filter(|r| r.id != resource_id)
            .filter_map(|r| {
                let similarity = cosine_similarity(query, r.embedding.as_deref()?);
                Some(SimilarResource {
                    resource: r,
                    similarity,
                })
            })
            .collect();

        neighbors.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.resource.id.cmp(&b.resource.id))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }
}
