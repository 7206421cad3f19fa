//! HTTP embedding provider implementation
//!
//! Implements `EmbeddingProvider` using any OpenAI-compatible `/v1/embeddings`
//! endpoint:
//! - **Ollama** (default): `http://localhost:11434/v1/embeddings` with `nomic-embed-text`
//! - **OpenAI**: `https://api.openai.com/v1/embeddings` with `text-embedding-3-small`
//! - **LiteLLM / vLLM / any OpenAI-compatible**: just set the URL
//!
//! Configured from the `embeddings` section of the explorer config
//! (see [`EmbeddingsConfig`](crate::EmbeddingsConfig)).

use super::traits::EmbeddingProvider;
use crate::EmbeddingsConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Providers commonly cap the number of inputs per request.
const BATCH_SIZE: usize = 50;

/// HTTP-based embedding provider using the OpenAI `/v1/embeddings` API format.
///
/// Cheaply cloneable (shares the reqwest client internally).
#[derive(Clone)]
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// OpenAI-compatible error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl HttpEmbeddingProvider {
    /// Create a provider with explicit settings.
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        dimensions: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            dimensions,
        })
    }

    /// Create a provider from the `embeddings` config section.
    ///
    /// Returns `Ok(None)` when the URL is empty or "disabled".
    pub fn from_config(config: &EmbeddingsConfig) -> Result<Option<Self>> {
        if config.url.is_empty() || config.url.eq_ignore_ascii_case("disabled") {
            return Ok(None);
        }
        Self::new(
            config.url.clone(),
            config.model.clone(),
            config.api_key.clone(),
            config.dimensions,
        )
        .map(Some)
    }

    /// Send one embedding request and parse the response.
    async fn request_embeddings(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut req = self.client.post(&self.url).json(&EmbeddingRequest {
            model: &self.model,
            input,
        });

        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .with_context(|| format!("Failed to connect to embedding API at {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(ErrorResponse {
                error: Some(detail),
            }) = serde_json::from_str::<ErrorResponse>(&body)
            {
                anyhow::bail!(
                    "Embedding API error ({}): {}",
                    status.as_u16(),
                    detail.message
                );
            }
            anyhow::bail!("Embedding API returned {}: {}", status.as_u16(), body);
        }

        let resp: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding API response")?;

        anyhow::ensure!(
            resp.data.len() == input.len(),
            "Embedding API returned {} vectors for {} inputs",
            resp.data.len(),
            input.len()
        );

        let mut data = resp.data;
        data.sort_by_key(|d| d.index);

        data.into_iter()
            .map(|d| {
                anyhow::ensure!(
                    d.embedding.len() == self.dimensions,
                    "Embedding dimension mismatch at index {}: expected {}, got {} (model: {})",
                    d.index,
                    self.dimensions,
                    d.embedding.len(),
                    self.model
                );
                Ok(d.embedding)
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.request_embeddings(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .context("Embedding API returned empty response")
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            all.extend(self.request_embeddings(chunk).await?);
        }
        Ok(all)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
