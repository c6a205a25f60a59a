use serde::{Deserialize, Serialize};

use super::Document;

pub const DEFAULT_MATCH_COUNT: usize = 5;
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.78;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    document: Document,
    similarity: f32,
}

impl ScoredDocument {
    pub fn new(document: Document, similarity: f32) -> Self {
        Self {
            document,
            similarity,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn similarity(&self) -> f32 {
        self.similarity
    }

    pub fn is_relevant(&self, threshold: f32) -> bool {
        self.similarity >= threshold
    }

    pub fn display_line(&self) -> String {
        format!("{} (similarity: {:.3})", self.document.title(), self.similarity)
    }
}

/// Ordered by descending similarity, never longer than the requested `k`.
pub type RetrievalResult = Vec<ScoredDocument>;

/// Parameters of one nearest-neighbour lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalQuery {
    k: usize,
    threshold: f32,
}

impl RetrievalQuery {
    pub fn new() -> Self {
        Self {
            k: DEFAULT_MATCH_COUNT,
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn summary(&self) -> String {
        format!("k={}, threshold={:.2}", self.k, self.threshold)
    }
}

impl Default for RetrievalQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// How grounding context is gathered for a question.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Embed the question and keep the nearest documents.
    Rag(RetrievalQuery),
    /// Skip ranking and hand every stored document to the model.
    FullCorpus,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Rag(_) => "rag",
            RetrievalMode::FullCorpus => "full_corpus",
        }
    }
}

impl Default for RetrievalMode {
    fn default() -> Self {
        RetrievalMode::Rag(RetrievalQuery::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_query_defaults() {
        let query = RetrievalQuery::default();

        assert_eq!(query.k(), 5);
        assert!((query.threshold() - 0.78).abs() < f32::EPSILON);
    }

    #[test]
    fn retrieval_query_builder() {
        let query = RetrievalQuery::new().with_k(3).with_threshold(0.5);

        assert_eq!(query.k(), 3);
        assert_eq!(query.summary(), "k=3, threshold=0.50");
    }

    #[test]
    fn scored_document_relevance() {
        let scored = ScoredDocument::new(Document::new("a", "Product: A"), 0.81);

        assert!(scored.is_relevant(0.78));
        assert!(!scored.is_relevant(0.9));
    }
}
