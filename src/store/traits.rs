//! LinkStore / ResourceStore trait definitions
//!
//! The explorer only reads from the library; persistence mechanics live
//! behind these traits. Both follow the project pattern: async trait +
//! Send + Sync for `Arc<dyn ...>` usage, with an in-memory implementation
//! for tests and offline use.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{Backlink, MentionHit, OutgoingLink, Resource, SimilarResource};

/// Read access to persisted, user- or system-created relations.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Relations leaving `resource_id`.
    async fn get_outgoing_links(&self, resource_id: &str) -> Result<Vec<OutgoingLink>>;

    /// Relations pointing at `resource_id`.
    async fn get_backlinks(&self, resource_id: &str) -> Result<Vec<Backlink>>;
}

/// Read access to resources and the indexes built over them.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Whether a project with this id exists.
    async fn project_exists(&self, project_id: &str) -> Result<bool>;

    /// Look up one resource within a project.
    async fn get_resource(&self, project_id: &str, resource_id: &str) -> Result<Option<Resource>>;

    /// Look up several resources; unknown ids are skipped.
    async fn get_resources(&self, project_id: &str, resource_ids: &[String])
        -> Result<Vec<Resource>>;

    /// Resources whose content mentions `title` (backlink detection).
    ///
    /// `exclude_id` is left out of the results.
    async fn search_mentions(
        &self,
        project_id: &str,
        title: &str,
        exclude_id: &str,
    ) -> Result<Vec<MentionHit>>;

    /// Resources whose titles occur in `text` (forward mentions).
    async fn resolve_titles_in(
        &self,
        project_id: &str,
        text: &str,
        exclude_id: &str,
    ) -> Result<Vec<MentionHit>>;

    /// Resources carrying `tag`, at most `limit` of them.
    ///
    /// Tags match when equal under [`normalize_tag`](super::normalize_tag).
    async fn resources_with_tag(
        &self,
        project_id: &str,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<Resource>>;

    /// Nearest neighbours of a resource's content embedding, best first.
    ///
    /// Returns an empty list when the resource has no embedding.
    async fn nearest_neighbors(
        &self,
        project_id: &str,
        resource_id: &str,
        k: usize,
    ) -> Result<Vec<SimilarResource>>;
}
