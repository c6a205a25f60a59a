use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rand::Rng;
use rand::SeedableRng;
use tracing::debug;

use crate::application::EmbeddingService;
use crate::domain::{DomainError, EmbeddingConfig};

/// Offline embedding: every lowercase word contributes a seeded pseudo-random
/// direction, so texts sharing words land close together.
pub struct MockEmbedding {
    config: EmbeddingConfig,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self {
            config: EmbeddingConfig::default(),
        }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            config: EmbeddingConfig::new("mock-embedding", dimensions),
        }
    }

    fn token_direction(&self, token: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let seed = hasher.finish();

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..self.config.dimensions())
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect()
    }

    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.config.dimensions()];

        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        for token in tokens {
            for (slot, value) in vector.iter_mut().zip(self.token_direction(&token)) {
                *slot += value;
            }
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }

        vector
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::embedding("cannot embed empty text"));
        }

        let vector = self.generate_embedding(text);
        debug!("Generated mock embedding with {} dimensions", vector.len());
        Ok(vector)
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}
