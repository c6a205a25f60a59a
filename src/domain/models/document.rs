use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A searchable flattening of one catalog record.
///
/// `embedding` is empty until the ingestion path fills it in; once stored, a
/// document is never mutated, only replaced by id or removed by a bulk clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    content: String,
    metadata: Map<String, Value>,
    #[serde(default)]
    embedding: Vec<f32>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Map::new(),
            embedding: Vec::new(),
        }
    }

    /// Rebuild a document read back from storage.
    pub fn reconstitute(
        id: String,
        content: String,
        metadata: Map<String, Value>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id,
            content,
            metadata,
            embedding,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }

    /// Display name pulled from metadata, used in listings.
    pub fn title(&self) -> &str {
        self.metadata
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&self.id)
    }
}
