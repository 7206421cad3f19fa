//! Offline hash-based embedding provider
//!
//! Embeds texts as L2-normalized bags of hashed words, so texts sharing
//! vocabulary end up close in cosine space. Needs no model or network, which
//! makes it the fallback for `embed --offline` and the provider used in tests.

use super::traits::EmbeddingProvider;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic feature-hashing embedding provider.
///
/// Each lowercased word is hashed into one of `dimensions` buckets with a
/// hash-derived sign; the resulting vector is L2-normalized. Identical texts
/// produce identical vectors, and the cosine similarity of two texts grows
/// with their shared vocabulary.
///
/// # Example
///
/// ```rust
/// use knowledge_explorer::embeddings::{EmbeddingProvider, HashEmbeddingProvider};
///
/// # tokio_test::block_on(async {
/// let provider = HashEmbeddingProvider::new(256);
/// let a = provider.embed_text("cell biology").await.unwrap();
/// let b = provider.embed_text("cell biology").await.unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 256);
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_to_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let hash = hasher.finish();
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        // L2-normalize for cosine similarity compatibility
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.hash_to_embedding(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.hash_to_embedding(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hash-bag-of-words"
    }
}
