//! Content embeddings for the semantic strategy.
//!
//! The semantic strategy searches nearest neighbours over resource content
//! embeddings. Resources imported without a vector get one from an
//! [`EmbeddingProvider`]:
//! - `HttpEmbeddingProvider`: any OpenAI-compatible `/v1/embeddings` API
//!   (Ollama, OpenAI, LiteLLM, vLLM, etc.)
//! - `HashEmbeddingProvider`: deterministic, offline hash embeddings

pub mod hashing;
pub mod provider;
pub mod traits;

pub use hashing::HashEmbeddingProvider;
pub use provider::HttpEmbeddingProvider;
pub use traits::EmbeddingProvider;
