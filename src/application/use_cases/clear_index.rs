use std::sync::Arc;

use tracing::info;

use crate::application::VectorRepository;
use crate::domain::DomainError;

/// Use case for removing every document from the collection.
pub struct ClearIndexUseCase {
    vector_repo: Arc<dyn VectorRepository>,
}

impl ClearIndexUseCase {
    pub fn new(vector_repo: Arc<dyn VectorRepository>) -> Self {
        Self { vector_repo }
    }

    /// Returns how many documents were removed.
    pub async fn execute(&self) -> Result<u64, DomainError> {
        let removed = self.vector_repo.count().await?;
        self.vector_repo.clear().await?;

        info!("Cleared {} documents", removed);

        Ok(removed)
    }
}
