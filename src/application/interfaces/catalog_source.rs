use async_trait::async_trait;

use crate::domain::{CatalogRecord, DomainError};

/// Read-only access to the product store.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load(&self) -> Result<Vec<CatalogRecord>, DomainError>;

    fn describe(&self) -> String;
}
