//! Embedding Service: turns entry text into the fixed-dimension vectors the
//! Vector Store indexes. An abstract collaborator by design — the default
//! implementation calls out over HTTP to a configurable endpoint, kept
//! behind the same trait seam as `Queue` and `VectorStore`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("embedding service returned {expected} dims, configured for {configured}")]
    DimensionMismatch { expected: usize, configured: usize },
}

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

pub struct HttpEmbeddingService {
    client: Client,
    endpoint: String,
    dimensions: usize,
}

impl HttpEmbeddingService {
    pub fn new(endpoint: String, dimensions: usize, timeout: Duration) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .user_agent(crate::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingService for HttpEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { input: text })
            .send()
            .await?
            .error_for_status()?
            .json::<EmbedResponse>()
            .await?;

        if response.embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: response.embedding.len(),
                configured: self.dimensions,
            });
        }

        Ok(response.embedding)
    }
}

/// Builds the text the Fetcher embeds: title plus a bounded prefix of
/// sanitized content, per spec §4.4 step 7.
pub fn embedding_input(title: &str, sanitized_content: Option<&str>) -> String {
    const CONTENT_PREFIX_CHARS: usize = 1000;
    match sanitized_content {
        Some(content) => {
            let prefix: String = content.chars().take(CONTENT_PREFIX_CHARS).collect();
            format!("{title}\n\n{prefix}")
        }
        None => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_input_concatenates_title_and_prefix() {
        let input = embedding_input("Title", Some("Body text"));
        assert_eq!(input, "Title\n\nBody text");
    }

    #[test]
    fn embedding_input_truncates_long_content() {
        let long = "a".repeat(5000);
        let input = embedding_input("T", Some(&long));
        assert_eq!(input.chars().count(), "T\n\n".chars().count() + 1000);
    }

    #[test]
    fn embedding_input_handles_missing_content() {
        assert_eq!(embedding_input("Title only", None), "Title only");
    }
}
