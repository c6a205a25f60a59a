use async_trait::async_trait;

use crate::domain::{DomainError, Document, RetrievalQuery, RetrievalResult};

/// Document storage and similarity search over one catalog collection.
///
/// Mutations are expected to be serialized by the caller; a `search` racing a
/// `clear` may observe either state.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Insert or replace documents by id. Every document must carry an embedding of
    /// the same dimension as those already stored.
    async fn upsert_all(&self, documents: &[Document]) -> Result<(), DomainError>;

    async fn clear(&self) -> Result<(), DomainError>;

    /// Up to `query.k()` documents with similarity at or above `query.threshold()`,
    /// best first, ties in insertion order.
    async fn search(
        &self,
        query_embedding: &[f32],
        query: &RetrievalQuery,
    ) -> Result<RetrievalResult, DomainError>;

    /// Every stored document in insertion order.
    async fn list_all(&self) -> Result<Vec<Document>, DomainError>;

    async fn count(&self) -> Result<u64, DomainError>;
}
