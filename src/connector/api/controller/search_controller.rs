use anyhow::Result;

use crate::domain::{RetrievalMode, RetrievalQuery, ScoredDocument};

use super::super::Container;

pub struct SearchController<'a> {
    container: &'a Container,
}

impl<'a> SearchController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// `num` and `threshold` default to the configured retrieval settings.
    pub async fn search(
        &self,
        query: String,
        num: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<String> {
        let mut retrieval_query = match self.container.retrieval_mode() {
            RetrievalMode::Rag(configured) => configured,
            RetrievalMode::FullCorpus => RetrievalQuery::default(),
        };
        if let Some(num) = num {
            retrieval_query = retrieval_query.with_k(num);
        }
        if let Some(threshold) = threshold {
            retrieval_query = retrieval_query.with_threshold(threshold);
        }

        let use_case = self.container.retrieve_use_case()?;
        let results = use_case.search(&query, &retrieval_query).await?;

        Ok(self.format_search_results(&results))
    }

    fn format_search_results(&self, results: &[ScoredDocument]) -> String {
        if results.is_empty() {
            return "No matching products found.".to_string();
        }

        let mut output = format!("Found {} products:\n\n", results.len());

        for (i, result) in results.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, result.display_line()));

            let preview: String = result
                .document()
                .content()
                .lines()
                .map(|l| format!("   | {}", l))
                .collect::<Vec<_>>()
                .join("\n");
            output.push_str(&preview);
            output.push_str("\n\n");
        }

        output
    }
}
