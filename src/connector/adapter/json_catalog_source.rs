use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::application::CatalogSource;
use crate::domain::{CatalogRecord, DomainError};

/// Catalog read from a JSON array of product records.
pub struct JsonCatalogSource {
    path: PathBuf,
}

impl JsonCatalogSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(json: &str) -> Result<Vec<CatalogRecord>, DomainError> {
        serde_json::from_str(json)
            .map_err(|e| DomainError::invalid_input(format!("Invalid catalog JSON: {}", e)))
    }
}

#[async_trait]
impl CatalogSource for JsonCatalogSource {
    async fn load(&self) -> Result<Vec<CatalogRecord>, DomainError> {
        let json = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DomainError::not_found(format!("Catalog file {}", self.path.display()))
            } else {
                DomainError::IoError(e)
            }
        })?;

        let records = Self::parse(&json)?;
        debug!("Loaded {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Catalog held in memory, for tests and embedding callers.
pub struct StaticCatalogSource {
    records: Vec<CatalogRecord>,
}

impl StaticCatalogSource {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn load(&self) -> Result<Vec<CatalogRecord>, DomainError> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory records", self.records.len())
    }
}
