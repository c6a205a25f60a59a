use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::application::use_cases::timeouts::{bounded, CallTimeouts};
use crate::application::{CatalogSource, EmbeddingService, VectorRepository};
use crate::domain::{build_document_at, CatalogRecord, DomainError};

/// Summary of a finished population job.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationReport {
    pub documents: usize,
    pub dimensions: usize,
    pub elapsed: Duration,
}

/// Builds, embeds and stores one document per catalog record.
///
/// The job stops at the first record whose embedding or write fails and reports
/// that record. Documents stored before the failure stay in place; rerunning the
/// job replaces them by id.
pub struct PopulateIndexUseCase {
    catalog: Arc<dyn CatalogSource>,
    vector_repo: Arc<dyn VectorRepository>,
    embedding_service: Arc<dyn EmbeddingService>,
    timeouts: CallTimeouts,
    show_progress: bool,
}

impl PopulateIndexUseCase {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        vector_repo: Arc<dyn VectorRepository>,
        embedding_service: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            catalog,
            vector_repo,
            embedding_service,
            timeouts: CallTimeouts::default(),
            show_progress: false,
        }
    }

    pub fn with_timeouts(mut self, timeouts: CallTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Load the catalog and index it. `fresh` clears the collection first.
    pub async fn execute(&self, fresh: bool) -> Result<PopulationReport, DomainError> {
        let records = self.catalog.load().await?;
        info!(
            "Loaded {} catalog records from {}",
            records.len(),
            self.catalog.describe()
        );

        if fresh {
            info!("Clearing existing documents before population");
            self.vector_repo.clear().await?;
        }

        self.index_records(&records).await
    }

    pub async fn index_records(
        &self,
        records: &[CatalogRecord],
    ) -> Result<PopulationReport, DomainError> {
        let start_time = Instant::now();

        let progress_bar = if self.show_progress {
            let bar = ProgressBar::new(records.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut dimensions = 0usize;
        let mut stored = 0usize;

        for (position, record) in records.iter().enumerate() {
            let record_key = record.key().to_string();
            progress_bar.set_message(record_key.clone());

            let document = build_document_at(record, position);
            debug!("Embedding document {} for record {}", document.id(), record_key);

            let embedding = match bounded(
                self.timeouts.embedding,
                self.embedding_service.embed(document.content()),
                DomainError::embedding,
            )
            .await
            {
                Ok(embedding) => embedding,
                Err(e) => {
                    progress_bar.abandon_with_message(format!("failed at {}", record_key));
                    warn!("Population aborted at record {}: {}", record_key, e);
                    return Err(DomainError::ingestion(record_key, e));
                }
            };

            if dimensions == 0 {
                dimensions = embedding.len();
            } else if embedding.len() != dimensions {
                progress_bar.abandon_with_message(format!("failed at {}", record_key));
                return Err(DomainError::ingestion(
                    record_key,
                    format!(
                        "embedding has {} dimensions, expected {}",
                        embedding.len(),
                        dimensions
                    ),
                ));
            }

            let document = document.with_embedding(embedding);
            if let Err(e) = self
                .vector_repo
                .upsert_all(std::slice::from_ref(&document))
                .await
            {
                progress_bar.abandon_with_message(format!("failed at {}", record_key));
                warn!("Population aborted at record {}: {}", record_key, e);
                return Err(DomainError::ingestion(record_key, e));
            }

            stored += 1;
            progress_bar.inc(1);
        }

        progress_bar.finish_with_message("done");

        let elapsed = start_time.elapsed();
        info!(
            "Populated {} documents ({} dimensions) in {:.2}s",
            stored,
            dimensions,
            elapsed.as_secs_f64()
        );

        Ok(PopulationReport {
            documents: stored,
            dimensions,
            elapsed,
        })
    }
}
