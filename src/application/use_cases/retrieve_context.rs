use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::application::use_cases::timeouts::{bounded, CallTimeouts};
use crate::application::{EmbeddingService, VectorRepository};
use crate::domain::{
    assemble_context, assemble_documents, DomainError, RetrievalMode, RetrievalQuery,
    RetrievalResult,
};

/// Grounding text gathered for one question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundingContext {
    pub text: String,
    pub documents: usize,
    /// Set when RAG retrieval failed and the context was left empty.
    pub degraded: bool,
}

impl GroundingContext {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub struct RetrieveContextUseCase {
    vector_repo: Arc<dyn VectorRepository>,
    embedding_service: Arc<dyn EmbeddingService>,
    mode: RetrievalMode,
    timeouts: CallTimeouts,
}

impl RetrieveContextUseCase {
    pub fn new(
        vector_repo: Arc<dyn VectorRepository>,
        embedding_service: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            vector_repo,
            embedding_service,
            mode: RetrievalMode::default(),
            timeouts: CallTimeouts::default(),
        }
    }

    pub fn with_mode(mut self, mode: RetrievalMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeouts(mut self, timeouts: CallTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn mode(&self) -> RetrievalMode {
        self.mode
    }

    /// Nearest documents for `text`. Errors propagate unchanged.
    pub async fn search(
        &self,
        text: &str,
        query: &RetrievalQuery,
    ) -> Result<RetrievalResult, DomainError> {
        let start_time = Instant::now();

        let query_embedding = bounded(
            self.timeouts.embedding,
            self.embedding_service.embed(text),
            DomainError::embedding,
        )
        .await?;

        let results = bounded(
            self.timeouts.retrieval,
            self.vector_repo.search(&query_embedding, query),
            DomainError::retrieval,
        )
        .await?;

        info!(
            "Found {} documents for \"{}\" ({}) in {:.2}s",
            results.len(),
            text,
            query.summary(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(results)
    }

    /// Gather grounding context for `question` according to the configured mode.
    ///
    /// In RAG mode a failed lookup degrades to an empty context so the turn can
    /// still be answered (ungrounded). In full-corpus mode the listing is the last
    /// resort, so its failure aborts with [`DomainError::Retrieval`].
    pub async fn retrieve(&self, question: &str) -> Result<GroundingContext, DomainError> {
        match self.mode {
            RetrievalMode::Rag(query) => match self.search(question, &query).await {
                Ok(results) => Ok(GroundingContext {
                    text: assemble_context(&results),
                    documents: results.len(),
                    degraded: false,
                }),
                Err(e) => {
                    warn!(
                        "Retrieval failed, answering without product context: {}",
                        e
                    );
                    Ok(GroundingContext {
                        degraded: true,
                        ..GroundingContext::default()
                    })
                }
            },
            RetrievalMode::FullCorpus => {
                let documents = bounded(
                    self.timeouts.retrieval,
                    self.vector_repo.list_all(),
                    DomainError::retrieval,
                )
                .await
                .map_err(|e| match e {
                    DomainError::Retrieval(_) => e,
                    other => DomainError::retrieval(other.to_string()),
                })?;

                info!("Using full corpus of {} documents as context", documents.len());

                Ok(GroundingContext {
                    text: assemble_documents(&documents),
                    documents: documents.len(),
                    degraded: false,
                })
            }
        }
    }
}
