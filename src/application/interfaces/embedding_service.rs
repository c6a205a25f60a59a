use async_trait::async_trait;

use crate::domain::{DomainError, EmbeddingConfig};

/// Turns text into a fixed-dimension vector.
///
/// Failures surface as [`DomainError::EmbeddingService`]; implementations must never
/// substitute a zero vector and do not retry.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn config(&self) -> &EmbeddingConfig;
}
