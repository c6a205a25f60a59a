use anyhow::Result;

use crate::domain::RetrievalMode;

use super::super::Container;

pub struct StatsController<'a> {
    container: &'a Container,
}

impl<'a> StatsController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn stats(&self) -> Result<String> {
        let documents = self.container.vector_repo().count().await?;
        Ok(self.format_stats(documents))
    }

    fn format_stats(&self, documents: u64) -> String {
        let retrieval = match self.container.retrieval_mode() {
            RetrievalMode::Rag(query) => format!("rag ({})", query.summary()),
            RetrievalMode::FullCorpus => "full corpus".to_string(),
        };
        let storage = if self.container.memory_storage() {
            "memory".to_string()
        } else {
            self.container.data_dir().to_string()
        };

        format!(
            "VoiceCart Statistics\n====================\nDocuments:  {}\nRetrieval:  {}\nStorage:    {}",
            documents, retrieval, storage
        )
    }
}
