use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::EmbeddingService;
use crate::domain::{DomainError, EmbeddingConfig};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embeddings client for OpenAI-compatible `/embeddings` endpoints.
///
/// Failed calls are reported as [`DomainError::EmbeddingService`]; there is no
/// retry and no zero-vector substitute.
///
/// | Variable          | Default                     |
/// |-------------------|-----------------------------|
/// | `OPENAI_API_KEY`  | required                    |
/// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
/// | `EMBEDDING_MODEL` | `text-embedding-3-small`    |
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    config: EmbeddingConfig,
}

impl OpenAiEmbedding {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DomainError::embedding("missing OpenAI API key"));
        }

        let model = model.into();
        let dimensions = Self::known_dimensions(&model);
        let base: String = base_url.into();
        let endpoint = format!("{}/embeddings", base.trim_end_matches('/'));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::embedding(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            endpoint,
            config: EmbeddingConfig::new(model, dimensions),
        })
    }

    pub fn from_env(timeout: Duration) -> Result<Self, DomainError> {
        let key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let base =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(key, model, base, timeout)
    }

    fn known_dimensions(model: &str) -> usize {
        match model {
            "text-embedding-3-large" => 3072,
            _ => DEFAULT_DIMENSIONS,
        }
    }

    async fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, DomainError> {
        let request = EmbeddingRequest {
            model: self.config.model_name(),
            input: inputs,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::embedding(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("OpenAI embeddings returned {status}: {body}");
            return Err(DomainError::embedding(format!(
                "API returned {status}: {body}"
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| DomainError::embedding(format!("failed to parse response: {e}")))?;

        parse_vectors(&mut parsed, inputs.len())
    }
}

fn parse_vectors(
    parsed: &mut EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, DomainError> {
    if parsed.data.len() != expected {
        return Err(DomainError::embedding(format!(
            "API returned {} embeddings for {} inputs",
            parsed.data.len(),
            expected
        )));
    }
    parsed.data.sort_by_key(|entry| entry.index);

    let vectors: Vec<Vec<f32>> = parsed
        .data
        .drain(..)
        .map(|entry| entry.embedding)
        .collect();

    if vectors.iter().any(|v| v.is_empty()) {
        return Err(DomainError::embedding("API returned an empty embedding"));
    }
    Ok(vectors)
}

#[async_trait]
impl EmbeddingService for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::embedding("cannot embed empty text"));
        }

        let mut vectors = self.request(&[text]).await?;
        debug!("Embedded {} chars with {}", text.len(), self.config.model_name());
        vectors
            .pop()
            .ok_or_else(|| DomainError::embedding("API returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.request(&inputs).await
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_rejected() {
        let err = OpenAiEmbedding::new("  ", DEFAULT_MODEL, DEFAULT_BASE_URL, Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, DomainError::EmbeddingService(_)));
    }

    #[test]
    fn endpoint_and_dimensions_follow_configuration() {
        let client = OpenAiEmbedding::new(
            "sk-test",
            "text-embedding-3-large",
            "http://localhost:8080/v1/",
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(client.endpoint, "http://localhost:8080/v1/embeddings");
        assert_eq!(client.config().dimensions(), 3072);
    }

    #[test]
    fn vectors_are_reordered_by_index() {
        let mut parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .unwrap();

        let vectors = parse_vectors(&mut parsed, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn count_mismatch_is_an_error() {
        let mut parsed: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#).unwrap();

        assert!(parse_vectors(&mut parsed, 2).is_err());
    }
}
