//! HTTP client for a text-embeddings-inference service.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, error, warn};

use alm_types::Settings;

use crate::capabilities::Embedder;
use crate::error::AgentError;

/// Configuration for [`TeiEmbedder`].
#[derive(Debug, Clone)]
pub struct TeiEmbedderConfig {
    /// Service base URL, e.g. `http://alm-embedding:8080`
    pub api_url: String,

    /// Vector dimension the service must return
    pub dimension: usize,

    pub timeout: Duration,

    /// Attempts per request, the first one included
    pub max_retries: u32,
}

impl TeiEmbedderConfig {
    pub fn new(api_url: impl Into<String>, dimension: usize) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            dimension,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.embeddings.timeout_secs),
            ..Self::new(&settings.embeddings.api_url, settings.rag.embedding_dim)
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: [&'a str; 1],
}

/// Embeds text through `POST {api_url}/embed`.
pub struct TeiEmbedder {
    client: Client,
    config: TeiEmbedderConfig,
}

impl TeiEmbedder {
    pub fn new(config: TeiEmbedderConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TeiEmbedderConfig {
        &self.config
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        let url = format!("{}/embed", self.config.api_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { inputs: [text] })
            .send()
            .await
            .map_err(|e| AgentError::Embedding(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::EmbeddingStatus {
                status: status.as_u16(),
                body,
            });
        }

        let mut vectors: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(format!("embedding response: {e}")))?;
        if vectors.len() != 1 {
            return Err(AgentError::InvalidResponse(format!(
                "expected 1 embedding, got {}",
                vectors.len()
            )));
        }
        let vector = vectors.remove(0);

        if vector.len() != self.config.dimension {
            return Err(AgentError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

/// Transport failures, throttling and server errors are retried; client
/// errors and malformed answers are not.
fn is_retryable(err: &AgentError) -> bool {
    match err {
        AgentError::Embedding(_) => true,
        AgentError::EmbeddingStatus { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
        }
        _ => false,
    }
}

#[async_trait]
impl Embedder for TeiEmbedder {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(200),
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, chars = text.len(), "Requesting embedding");

            match self.request(text).await {
                Ok(vector) => return Ok(vector),
                Err(e) => {
                    if !is_retryable(&e) || attempts >= self.config.max_retries {
                        error!(error = %e, attempts, "Embedding failed");
                        return Err(e);
                    }
                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "Embedding request failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}
