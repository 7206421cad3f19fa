//! EmbeddingProvider trait definition
//!
//! Same shape as the store traits: async trait + Send + Sync for
//! `Arc<dyn EmbeddingProvider>` usage.

use anyhow::Result;
use async_trait::async_trait;

/// Abstract interface for generating vector embeddings from text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate a vector embedding for a single text input.
    ///
    /// Returns a vector of `f32` with length equal to [`dimensions()`](Self::dimensions).
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for several texts, one per input, in input order.
    ///
    /// All-or-nothing: an error means no embedding of the batch is usable.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The dimensionality of the vectors produced by this provider.
    fn dimensions(&self) -> usize;

    /// The name of the embedding model, for traceability.
    fn model_name(&self) -> &str;
}
