use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::VectorRepository;
use crate::domain::{
    cosine_similarity, DomainError, Document, RetrievalQuery, RetrievalResult, ScoredDocument,
};

#[derive(Default)]
struct Store {
    /// Insertion order; a replaced document keeps its original slot.
    documents: Vec<Document>,
    positions: HashMap<String, usize>,
}

/// Linear-scan index held in process memory.
pub struct InMemoryVectorRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryVectorRepository {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::default())),
        }
    }
}

impl Default for InMemoryVectorRepository {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn check_dimensions(
    documents: &[Document],
    existing: Option<usize>,
) -> Result<(), DomainError> {
    let mut expected = existing;
    for document in documents {
        if !document.has_embedding() {
            return Err(DomainError::invalid_input(format!(
                "Document {} has no embedding",
                document.id()
            )));
        }
        match expected {
            Some(dimensions) if dimensions != document.dimensions() => {
                return Err(DomainError::invalid_input(format!(
                    "Expected embedding dimension {}, got {} for document {}",
                    dimensions,
                    document.dimensions(),
                    document.id()
                )));
            }
            Some(_) => {}
            None => expected = Some(document.dimensions()),
        }
    }
    Ok(())
}

/// Score every candidate, keep those at or above the threshold, best first.
///
/// Negative thresholds count as zero so opposed vectors never match.
/// `candidates` must be in insertion order; the stable sort keeps that order
/// among equal scores.
pub(crate) fn rank(
    candidates: impl IntoIterator<Item = Document>,
    query_embedding: &[f32],
    query: &RetrievalQuery,
) -> RetrievalResult {
    let threshold = query.threshold().max(0.0);
    let mut scored: Vec<ScoredDocument> = candidates
        .into_iter()
        .map(|document| {
            let similarity = cosine_similarity(query_embedding, document.embedding());
            ScoredDocument::new(document, similarity)
        })
        .filter(|scored| scored.is_relevant(threshold))
        .collect();

    scored.sort_by(|a, b| {
        b.similarity()
            .partial_cmp(&a.similarity())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(query.k());
    scored
}

#[async_trait]
impl VectorRepository for InMemoryVectorRepository {
    async fn upsert_all(&self, documents: &[Document]) -> Result<(), DomainError> {
        let mut store = self.store.lock().await;

        let existing = store.documents.first().map(Document::dimensions);
        check_dimensions(documents, existing)?;

        for document in documents {
            match store.positions.get(document.id()).copied() {
                Some(position) => store.documents[position] = document.clone(),
                None => {
                    let position = store.documents.len();
                    store.positions.insert(document.id().to_string(), position);
                    store.documents.push(document.clone());
                }
            }
        }

        debug!("Upserted {} documents into memory", documents.len());
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut store = self.store.lock().await;
        store.documents.clear();
        store.positions.clear();
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        query: &RetrievalQuery,
    ) -> Result<RetrievalResult, DomainError> {
        let candidates = {
            let store = self.store.lock().await;
            store.documents.clone()
        };

        Ok(rank(candidates, query_embedding, query))
    }

    async fn list_all(&self) -> Result<Vec<Document>, DomainError> {
        let store = self.store.lock().await;
        Ok(store.documents.clone())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let store = self.store.lock().await;
        Ok(store.documents.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Vec<f32>) -> Document {
        Document::new(id, format!("Product: {}", id)).with_embedding(embedding)
    }

    #[tokio::test]
    async fn search_orders_by_similarity_and_respects_k() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert_all(&[
            doc("far", vec![0.0, 1.0]),
            doc("near", vec![1.0, 0.1]),
            doc("exact", vec![1.0, 0.0]),
        ])
        .await
        .unwrap();

        let query = RetrievalQuery::new().with_k(2).with_threshold(0.0);
        let results = repo.search(&[1.0, 0.0], &query).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document().id(), "exact");
        assert_eq!(results[1].document().id(), "near");
        assert!(results[0].similarity() >= results[1].similarity());
    }

    #[tokio::test]
    async fn threshold_filters_everything_out() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert_all(&[doc("a", vec![0.0, 1.0])]).await.unwrap();

        let results = repo
            .search(&[1.0, 0.0], &RetrievalQuery::default())
            .await
            .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn negative_threshold_still_drops_opposed_vectors() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert_all(&[doc("opposite", vec![-1.0, 0.0]), doc("side", vec![0.0, 1.0])])
            .await
            .unwrap();

        let query = RetrievalQuery::new().with_threshold(-1.0);
        let results = repo.search(&[1.0, 0.0], &query).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document().id(), "side");
        assert!(results.iter().all(|r| r.similarity() >= 0.0));
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert_all(&[
            doc("first", vec![1.0, 0.0]),
            doc("second", vec![2.0, 0.0]),
            doc("third", vec![3.0, 0.0]),
        ])
        .await
        .unwrap();

        let results = repo
            .search(&[1.0, 0.0], &RetrievalQuery::default())
            .await
            .unwrap();

        let ids: Vec<_> = results.iter().map(|r| r.document().id()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_in_place() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert_all(&[doc("a", vec![1.0, 0.0]), doc("b", vec![0.0, 1.0])])
            .await
            .unwrap();

        let replacement = Document::new("a", "Product: A v2").with_embedding(vec![1.0, 0.0]);
        repo.upsert_all(&[replacement]).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content(), "Product: A v2");
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rejects_mismatched_dimensions() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert_all(&[doc("a", vec![1.0, 0.0])]).await.unwrap();

        let err = repo
            .upsert_all(&[doc("b", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let err = repo.upsert_all(&[Document::new("c", "x")]).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn clear_then_upsert_finds_own_embedding_first() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert_all(&[doc("stale", vec![0.5, 0.5])]).await.unwrap();
        repo.clear().await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);

        let target = doc("target", vec![0.2, 0.9]);
        repo.upsert_all(&[doc("other", vec![0.9, 0.1]), target.clone()])
            .await
            .unwrap();

        let results = repo
            .search(target.embedding(), &RetrievalQuery::default())
            .await
            .unwrap();

        assert_eq!(results[0].document().id(), "target");
        assert!((results[0].similarity() - 1.0).abs() < 1e-5);
    }
}
