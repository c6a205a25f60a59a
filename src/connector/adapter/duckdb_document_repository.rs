use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use duckdb::{params, Connection};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::in_memory_vector_repository::{check_dimensions, rank};
use crate::application::VectorRepository;
use crate::domain::{DomainError, Document, RetrievalQuery, RetrievalResult};

/// Persistent document index backed by a DuckDB file.
///
/// Embeddings are stored as little-endian `f32` blobs and scored in process,
/// so any embedding width works without schema changes.
pub struct DuckdbDocumentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbDocumentRepository {
    pub fn new(path: &Path) -> Result<Self, DomainError> {
        let conn = Connection::open(path)
            .map_err(|e| DomainError::storage(format!("Failed to open DuckDB database: {}", e)))?;
        Self::initialize(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DomainError::storage(format!("Failed to open DuckDB in-memory DB: {}", e))
        })?;
        Self::initialize(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize(conn: &Connection) -> Result<(), DomainError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                seq BIGINT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                dimensions BIGINT NOT NULL,
                embedding BLOB NOT NULL
            );
            "#,
        )
        .map_err(|e| DomainError::storage(format!("Failed to initialize DuckDB tables: {}", e)))?;

        debug!("DuckDB documents table ready");
        Ok(())
    }

    fn encode_embedding(vector: &[f32]) -> Vec<u8> {
        vector.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, DomainError> {
        if bytes.len() % 4 != 0 {
            return Err(DomainError::storage(format!(
                "Corrupt embedding blob of {} bytes",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    fn stored_dimensions(conn: &Connection) -> Result<Option<usize>, DomainError> {
        let dimensions: Option<i64> = conn
            .query_row("SELECT MAX(dimensions) FROM documents", [], |row| row.get(0))
            .map_err(|e| DomainError::storage(format!("Failed to read dimensions: {}", e)))?;
        Ok(dimensions.map(|d| d as usize))
    }

    fn load_all(conn: &Connection) -> Result<Vec<Document>, DomainError> {
        let mut stmt = conn
            .prepare("SELECT id, content, metadata, embedding FROM documents ORDER BY seq")
            .map_err(|e| DomainError::storage(format!("Failed to prepare listing: {}", e)))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| DomainError::storage(format!("Failed to list documents: {}", e)))?;

        let mut documents = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?
        {
            let id: String = row
                .get(0)
                .map_err(|e| DomainError::storage(format!("Failed to read id: {}", e)))?;
            let content: String = row
                .get(1)
                .map_err(|e| DomainError::storage(format!("Failed to read content: {}", e)))?;
            let metadata: String = row
                .get(2)
                .map_err(|e| DomainError::storage(format!("Failed to read metadata: {}", e)))?;
            let blob: Vec<u8> = row
                .get(3)
                .map_err(|e| DomainError::storage(format!("Failed to read embedding: {}", e)))?;

            let metadata: Map<String, Value> = serde_json::from_str(&metadata).map_err(|e| {
                DomainError::storage(format!("Corrupt metadata for document {}: {}", id, e))
            })?;
            let embedding = Self::decode_embedding(&blob)?;

            documents.push(Document::reconstitute(id, content, metadata, embedding));
        }
        Ok(documents)
    }
}

#[async_trait]
impl VectorRepository for DuckdbDocumentRepository {
    async fn upsert_all(&self, documents: &[Document]) -> Result<(), DomainError> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        check_dimensions(documents, Self::stored_dimensions(&conn)?)?;

        let next_seq: i64 = conn
            .query_row("SELECT COALESCE(MAX(seq), 0) FROM documents", [], |row| {
                row.get(0)
            })
            .map_err(|e| DomainError::storage(format!("Failed to read sequence: {}", e)))?;

        let tx = conn
            .transaction()
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO documents (id, seq, content, metadata, dimensions, embedding) \
                     VALUES (?, ?, ?, ?, ?, ?) \
                     ON CONFLICT (id) DO UPDATE SET \
                        content = excluded.content, \
                        metadata = excluded.metadata, \
                        dimensions = excluded.dimensions, \
                        embedding = excluded.embedding",
                )
                .map_err(|e| {
                    DomainError::storage(format!("Failed to prepare document upsert: {}", e))
                })?;

            for (offset, document) in documents.iter().enumerate() {
                let metadata = serde_json::to_string(document.metadata()).map_err(|e| {
                    DomainError::storage(format!(
                        "Failed to encode metadata for {}: {}",
                        document.id(),
                        e
                    ))
                })?;

                stmt.execute(params![
                    document.id(),
                    next_seq + offset as i64 + 1,
                    document.content(),
                    metadata,
                    document.dimensions() as i64,
                    Self::encode_embedding(document.embedding()),
                ])
                .map_err(|e| {
                    DomainError::storage(format!(
                        "Failed to upsert document {}: {}",
                        document.id(),
                        e
                    ))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| DomainError::storage(format!("Failed to commit: {}", e)))?;

        debug!("Upserted {} documents into DuckDB", documents.len());
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM documents", [])
            .map_err(|e| DomainError::storage(format!("Failed to clear documents: {}", e)))?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        query: &RetrievalQuery,
    ) -> Result<RetrievalResult, DomainError> {
        let documents = {
            let conn = self.conn.lock().await;
            Self::load_all(&conn)?
        };

        Ok(rank(documents, query_embedding, query))
    }

    async fn list_all(&self) -> Result<Vec<Document>, DomainError> {
        let conn = self.conn.lock().await;
        Self::load_all(&conn)
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(|e| DomainError::storage(format!("Failed to count documents: {}", e)))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_blob_round_trips() {
        let vector = vec![0.25_f32, -1.5, 3.0e-7];
        let blob = DuckdbDocumentRepository::encode_embedding(&vector);
        assert_eq!(blob.len(), 12);
        assert_eq!(
            DuckdbDocumentRepository::decode_embedding(&blob).unwrap(),
            vector
        );
    }

    #[test]
    fn truncated_blob_is_a_storage_error() {
        let err = DuckdbDocumentRepository::decode_embedding(&[0, 1, 2]).unwrap_err();
        assert!(err.is_storage_error());
    }
}
